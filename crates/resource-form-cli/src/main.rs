use std::{io::Read as _, path::PathBuf};

use clap::{Parser, ValueEnum};
use resource_form::{
    control::Status,
    editor::{self, ManifestEditor},
    field_group::ResourceForm,
    kubernetes::{ContainerForm, DeploymentForm, PodSpecForm},
    logging,
    path::{ParsePathError, Path},
    yaml::{self, SerializeOptions},
};
use serde_json::Value;
use snafu::{ResultExt, Snafu, ensure};

const APP_NAME: &str = "resource-form";
const LOG_ENV: &str = "RESOURCE_FORM_LOG";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitLogging { source: logging::Error },

    #[snafu(display("failed to read manifest from {}", path.display()))]
    ReadManifest {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to read manifest from stdin"))]
    ReadStdin { source: std::io::Error },

    #[snafu(display("failed to load manifest"))]
    LoadManifest { source: editor::Error },

    #[snafu(display("failed to set {path}"))]
    SetValue { source: editor::Error, path: Path },

    #[snafu(display("failed to render validation errors"))]
    RenderErrors { source: yaml::Error },

    #[snafu(display("the {kind} form is invalid"))]
    InvalidResource { kind: &'static str },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Kind {
    Deployment,
    PodSpec,
    Container,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Deployment => "deployment",
            Self::PodSpec => "pod-spec",
            Self::Container => "container",
        }
    }
}

/// Loads a manifest into a form, applies edits through the form and prints
/// the synchronized manifest.
#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, long_about = "")]
struct Cli {
    /// Path to the manifest, `-` reads from stdin
    #[arg(long, short = 'm', value_name = "FILE", default_value = "-", env = "RESOURCE_FORM_MANIFEST")]
    manifest: PathBuf,

    /// The form used to edit the manifest
    #[arg(long, short = 'k', value_enum, default_value_t = Kind::Deployment, env = "RESOURCE_FORM_KIND")]
    kind: Kind,

    /// Sets the field at PATH to VALUE, which is parsed as YAML. Fields
    /// without a form control are edited in the manifest text instead.
    #[arg(long = "set", value_name = "PATH=VALUE", value_parser = parse_assignment)]
    assignments: Vec<Assignment>,

    /// Fails when the form is invalid after all edits
    #[arg(long, env = "RESOURCE_FORM_STRICT")]
    strict: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Assignment {
    path: Path,
    value: Value,
}

#[derive(Debug, Snafu)]
enum ParseAssignmentError {
    #[snafu(display("expected PATH=VALUE"))]
    MissingEquals,

    #[snafu(display("invalid path"))]
    InvalidPath { source: ParsePathError },

    #[snafu(display("invalid YAML value"))]
    InvalidValue { source: serde_yaml::Error },
}

fn parse_assignment(input: &str) -> Result<Assignment, ParseAssignmentError> {
    let (path, value) = input.split_once('=').ok_or(ParseAssignmentError::MissingEquals)?;

    Ok(Assignment {
        path: path.parse().context(InvalidPathSnafu)?,
        value: serde_yaml::from_str(value).context(InvalidValueSnafu)?,
    })
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    logging::initialize_logging(LOG_ENV, APP_NAME).context(InitLoggingSnafu)?;

    let manifest = read_manifest(&cli.manifest)?;
    match cli.kind {
        Kind::Deployment => run(&cli, DeploymentForm::new(), &manifest),
        Kind::PodSpec => run(&cli, PodSpecForm::new(), &manifest),
        Kind::Container => run(&cli, ContainerForm::new(), &manifest),
    }
}

fn read_manifest(path: &std::path::Path) -> Result<String, Error> {
    if path.as_os_str() == "-" {
        let mut manifest = String::new();
        std::io::stdin()
            .read_to_string(&mut manifest)
            .context(ReadStdinSnafu)?;
        Ok(manifest)
    } else {
        std::fs::read_to_string(path).context(ReadManifestSnafu { path })
    }
}

fn run<F: ResourceForm>(cli: &Cli, definition: F, manifest: &str) -> Result<(), Error> {
    let mut editor = ManifestEditor::new(definition);
    editor.load(manifest).context(LoadManifestSnafu)?;

    for Assignment { path, value } in &cli.assignments {
        let set = editor
            .set_value(path, value.clone())
            .context(SetValueSnafu { path: path.clone() })?;

        if !set {
            tracing::info!(%path, "no form control, editing the manifest text");
            editor
                .patch_resource(path, value.clone())
                .context(SetValueSnafu { path: path.clone() })?;
        }
    }

    print!("{}", editor.text());

    let status = editor.validity();
    if let Some(errors) = editor.errors() {
        let rendered = yaml::to_string(&errors, SerializeOptions::default())
            .context(RenderErrorsSnafu)?;
        eprint!("{rendered}");
    }
    tracing::debug!(%status, "synchronized manifest");

    ensure!(
        !cli.strict || status != Status::Invalid,
        InvalidResourceSnafu {
            kind: cli.kind.as_str()
        }
    );
    Ok(())
}
