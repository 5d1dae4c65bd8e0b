use indoc::indoc;
use k8s_openapi::api::apps::v1::Deployment;
use resource_form::{
    control::Status,
    editor::ManifestEditor,
    field_group::FieldGroup,
    kubernetes::DeploymentForm,
    path,
};
use serde_json::json;

const MANIFEST: &str = indoc! {"
    apiVersion: apps/v1
    kind: Deployment
    metadata:
      name: web
      namespace: default
      labels:
        app: web
    spec:
      replicas: 2
      selector:
        matchLabels:
          app: web
      template:
        metadata:
          labels:
            app: web
        spec:
          containers:
            - name: nginx
              image: nginx:1.27
              ports:
                - containerPort: 80
"};

#[test]
fn typed_deployment_round_trip() {
    let deployment: Deployment = serde_yaml::from_str(MANIFEST).unwrap();

    let mut field_group = FieldGroup::new(DeploymentForm::new());
    field_group.write_resource(&deployment).unwrap();
    assert_eq!(field_group.validity(), Status::Valid);
    assert_eq!(field_group.resource::<Deployment>().unwrap(), deployment);

    field_group.set_value(&path!("spec", "replicas"), json!(5));
    field_group.edit_pod_spec(|pod_spec| {
        pod_spec.edit_container(0, |container| {
            container.set_value(&path!("image"), json!("nginx:1.28"))
        })
    });

    let edited: Deployment = field_group.resource().unwrap();
    let spec = edited.spec.unwrap();
    assert_eq!(spec.replicas, Some(5));

    let container = &spec.template.spec.unwrap().containers[0];
    assert_eq!(container.image.as_deref(), Some("nginx:1.28"));
    assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 80);
    assert_eq!(edited.metadata.name.as_deref(), Some("web"));
}

#[test]
fn editor_renders_nested_edits() {
    let mut editor = ManifestEditor::new(DeploymentForm::new());
    editor.load(MANIFEST).unwrap();

    editor
        .edit_field_group(|deployment| {
            deployment.edit_key_values(&path!("metadata", "labels"), |labels| {
                labels.set_value(&path!(0, 1), json!("api"))
            })
        })
        .unwrap();

    let rendered: Deployment = serde_yaml::from_str(editor.text()).unwrap();
    assert_eq!(
        rendered.metadata.labels.unwrap().get("app").map(String::as_str),
        Some("api")
    );
    assert_eq!(
        rendered.spec.unwrap().selector.match_labels.unwrap().get("app").map(String::as_str),
        Some("web")
    );
}

#[test]
fn invalid_names_are_reported_by_path() {
    let mut editor = ManifestEditor::new(DeploymentForm::new());
    editor.load(MANIFEST).unwrap();

    editor.set_value(&path!("metadata", "name"), json!("Web_App")).unwrap();
    assert_eq!(editor.validity(), Status::Invalid);

    let errors = editor.errors().unwrap();
    assert!(errors["metadata"]["name"]
        .as_object()
        .unwrap()
        .contains_key("rfc1123Label"));
}
