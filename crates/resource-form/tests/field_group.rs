use std::{cell::RefCell, rc::Rc};

use resource_form::{
    control::{Control, Status},
    field_group::{FieldGroup, FieldGroupState, FormContext},
    forms::{GroupForm, KeyValueForm},
    path,
    validation,
};
use serde_json::{Value, json};

/// A form whose `array` field is a comma separated list in the resource and a
/// list of strings in the form.
fn list_form() -> GroupForm {
    GroupForm::new("ListForm", || {
        Control::group([
            ("simple", Control::leaf("").with_validator(validation::required())),
            ("array", Control::array([])),
        ])
    })
    .with_resource_adapter(|mut resource| {
        let items: Vec<Value> = resource
            .get("array")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(Value::from)
            .collect();

        if let Some(object) = resource.as_object_mut() {
            object.insert("array".to_owned(), Value::Array(items));
        }
        resource
    })
    .with_form_adapter(|mut form_model| {
        let joined = form_model
            .get("array")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| match item.as_str().map(str::parse::<f64>) {
                        Some(Ok(number)) => number.to_string(),
                        _ => item.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();

        if let Some(object) = form_model.as_object_mut() {
            object.insert("array".to_owned(), Value::String(joined));
            object.insert("defaultField".to_owned(), json!("DEFAULT"));
        }
        form_model
    })
}

fn recorded(field_group: &mut FieldGroup<GroupForm>) -> Rc<RefCell<Vec<Value>>> {
    let emitted = Rc::new(RefCell::new(Vec::new()));
    let sink = emitted.clone();
    field_group.register_on_change(move |value| sink.borrow_mut().push(value.clone()));
    emitted
}

#[test]
fn write_value_initializes_the_form() {
    let mut field_group = FieldGroup::new(list_form());
    let emitted = recorded(&mut field_group);

    let resource = json!({ "simple": "123", "ignored": 456, "array": "0,1 ,2" });
    field_group.write_value(resource.clone());

    assert!(emitted.borrow().is_empty());
    assert_eq!(*field_group.value(), resource);
    assert_eq!(field_group.state(), FieldGroupState::Bound);
    assert!(!field_group.is_submitted());

    let form = field_group.form().unwrap();
    assert!(!form.is_dirty());
    assert_eq!(
        form.value(),
        json!({ "simple": "123", "array": ["0", "1", "2"] })
    );
    assert_eq!(form.get(&path!("array")).unwrap().as_array().unwrap().len(), 3);
}

#[test]
fn editing_a_leaf_emits_the_resource() {
    let mut field_group = FieldGroup::new(list_form());
    let emitted = recorded(&mut field_group);
    field_group.write_value(json!({ "simple": "123", "ignored": 456 }));

    assert!(field_group.set_value(&path!("simple"), json!("444")));
    assert_eq!(
        emitted.borrow().last().unwrap(),
        &json!({
            "simple": "444",
            "ignored": 456,
            "array": "",
            "defaultField": "DEFAULT",
        })
    );
}

#[test]
fn editing_array_items_emits_the_joined_list() {
    let mut field_group = FieldGroup::new(list_form());
    let emitted = recorded(&mut field_group);
    field_group.write_value(json!({ "simple": "123", "ignored": 456, "array": "0,1 ,2" }));

    field_group.set_value(&path!("array", 0), json!("2"));
    assert_eq!(
        emitted.borrow().last().unwrap(),
        &json!({
            "simple": "123",
            "ignored": 456,
            "array": "2,1,2",
            "defaultField": "DEFAULT",
        })
    );

    field_group.set_value(&path!("array", 1), json!("3"));
    field_group.set_value(&path!("array", 2), json!("4"));
    assert_eq!(emitted.borrow().len(), 3);
    assert_eq!(emitted.borrow()[2]["array"], json!("2,3,4"));
}

#[test]
fn clearing_a_required_field_is_invalid() {
    let mut field_group = FieldGroup::new(list_form());
    field_group.write_value(json!({ "simple": "123", "ignored": 456 }));
    assert_eq!(field_group.validity(), Status::Valid);

    field_group.set_value(&path!("simple"), json!(""));
    assert_eq!(field_group.validity(), Status::Invalid);
    assert_eq!(
        field_group.errors(),
        Some(validation::error("simple", json!({ "required": true })))
    );
    assert_eq!(
        field_group.validate(),
        Some(validation::error("ListForm", json!(true)))
    );
}

#[test]
fn nested_field_group_reports_touched_and_validity() {
    let mut parent = Control::group([("default", Control::bound(FieldGroup::new(list_form())))]);
    parent.set_value(json!({ "default": { "simple": "123", "ignored": 456 } }));
    assert!(!parent.is_touched());
    assert_eq!(parent.status(), Status::Valid);

    let nested = parent
        .get_mut(&path!("default"))
        .and_then(Control::accessor_mut::<FieldGroup<GroupForm>>)
        .unwrap();
    nested.on_blur();
    nested.set_value(&path!("simple"), json!(""));

    assert!(parent.is_touched());
    assert_eq!(parent.status(), Status::Invalid);
    assert_eq!(parent.errors(), None);
    assert_eq!(
        parent.get(&path!("default")).unwrap().errors(),
        Some(validation::error("ListForm", json!(true)))
    );
}

#[test]
fn nested_field_group_sees_parent_submission() {
    let context = FormContext::new();
    let mut field_group = FieldGroup::new(list_form()).with_context(context.clone());
    field_group.write_value(json!({ "simple": "123", "ignored": 456 }));
    assert!(!field_group.is_submitted());

    context.submit();
    assert!(field_group.is_submitted());
}

#[test]
fn destroyed_field_group_ignores_writes() {
    let mut field_group = FieldGroup::new(list_form());
    let emitted = recorded(&mut field_group);
    field_group.write_value(json!({ "simple": "123" }));
    field_group.destroy();

    field_group.write_value(json!({ "simple": "456" }));
    field_group.set_value(&path!("simple"), json!("789"));

    assert!(emitted.borrow().is_empty());
    assert_eq!(field_group.validity(), Status::Pending);
    assert_eq!(field_group.form_model()["simple"], json!("789"));
}

#[test]
fn destroying_a_parent_destroys_nested_field_groups() {
    let parent_form = GroupForm::new("ParentForm", || {
        Control::group([("nested", Control::bound(FieldGroup::new(KeyValueForm::new())))])
    });
    let mut parent = FieldGroup::new(parent_form);
    parent.write_value(json!({ "nested": { "app": "web" } }));

    let nested_validity = |parent: &FieldGroup<GroupForm>| {
        parent
            .form()
            .and_then(|form| form.get(&path!("nested")))
            .and_then(Control::accessor)
            .map(|nested| nested.validity())
    };
    assert_eq!(nested_validity(&parent), Some(Status::Valid));

    parent.destroy();
    assert_eq!(parent.validity(), Status::Pending);
    assert_eq!(nested_validity(&parent), Some(Status::Pending));

    let nested = parent
        .form()
        .and_then(|form| form.get(&path!("nested")))
        .and_then(Control::accessor)
        .and_then(|nested| nested.downcast_ref::<FieldGroup<KeyValueForm>>())
        .unwrap();
    assert_eq!(nested.state(), FieldGroupState::Destroyed);
}

#[test]
fn setting_the_current_value_emits_nothing() {
    let mut field_group = FieldGroup::new(list_form());
    let emitted = recorded(&mut field_group);
    field_group.write_value(json!({ "simple": "123" }));

    assert!(field_group.set_value(&path!("simple"), json!("123")));
    assert!(emitted.borrow().is_empty());
}
