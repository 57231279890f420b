use layers::ScaleError;
use scene::FeatureError;
use streaming::ApiError;

/// Failure of a conversation step. Every variant is also written to the
/// conversation log before it is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerError {
    EmptyQuestion,
    /// A chart answer needs two numeric series.
    MalformedChart { found: usize },
    Backend(ApiError),
    /// The prescription service answered but reported failure.
    PrescriptionRejected,
    NoActiveField,
}

impl std::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerError::EmptyQuestion => write!(f, "please enter a question"),
            ControllerError::MalformedChart { found } => write!(
                f,
                "chart answer needs at least 2 numeric series, found {found}"
            ),
            ControllerError::Backend(err) => write!(f, "{err}"),
            ControllerError::PrescriptionRejected => {
                write!(f, "prescription service could not build maps")
            }
            ControllerError::NoActiveField => write!(f, "no field selected"),
        }
    }
}

impl std::error::Error for ControllerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControllerError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for ControllerError {
    fn from(err: ApiError) -> Self {
        ControllerError::Backend(err)
    }
}

#[derive(Debug)]
pub enum DashboardError {
    UnknownField(String),
    NoActiveField,
    /// Painting outside edit mode.
    NotEditing,
    Scale(ScaleError),
    Feature {
        field: String,
        source: FeatureError,
    },
    Io {
        path: String,
        source: std::io::Error,
    },
    Controller(ControllerError),
    Save(ApiError),
    /// The service answered the save with `success: false`.
    SaveRejected,
    Statistics(String),
}

impl std::fmt::Display for DashboardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DashboardError::UnknownField(name) => write!(f, "unknown field {name:?}"),
            DashboardError::NoActiveField => write!(f, "no field selected"),
            DashboardError::NotEditing => write!(f, "not in edit mode"),
            DashboardError::Scale(err) => write!(f, "color scale: {err}"),
            DashboardError::Feature { field, source } => {
                write!(f, "field {field:?}: {source}")
            }
            DashboardError::Io { path, source } => write!(f, "{path}: {source}"),
            DashboardError::Controller(err) => write!(f, "{err}"),
            DashboardError::Save(err) => write!(f, "save failed: {err}"),
            DashboardError::SaveRejected => write!(f, "save failed: tile service rejected the edits"),
            DashboardError::Statistics(msg) => write!(f, "statistics: {msg}"),
        }
    }
}

impl std::error::Error for DashboardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DashboardError::Scale(err) => Some(err),
            DashboardError::Feature { source, .. } => Some(source),
            DashboardError::Io { source, .. } => Some(source),
            DashboardError::Controller(err) => Some(err),
            DashboardError::Save(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ScaleError> for DashboardError {
    fn from(err: ScaleError) -> Self {
        DashboardError::Scale(err)
    }
}

impl From<ControllerError> for DashboardError {
    fn from(err: ControllerError) -> Self {
        DashboardError::Controller(err)
    }
}
