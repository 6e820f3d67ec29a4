use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

pub type RecaResult<T> = Result<T, RecaError>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidConfig,
    InvalidParameter,
    Variable,
    ModelSpec,
    Fit,
    Search,
    Multiple,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrString(Cow<'static, str>);

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<Cow<'static, str>>> From<T> for ErrString {
    fn from(v: T) -> Self {
        Self(v.into())
    }
}

#[derive(Debug)]
pub enum RecaError {
    InvalidConfig {
        message: ErrString,
    },
    InvalidParameter {
        message: ErrString,
    },
    /// Variable registration rejected: duplicate abbreviation, zero
    /// cardinality, or a frozen variable list.
    Variable {
        message: ErrString,
    },
    /// A model specification string failed to parse. `token` is the
    /// offending colon-separated group or abbreviation character.
    ModelSpec {
        token: ErrString,
        message: ErrString,
    },
    Fit {
        message: ErrString,
    },
    Search {
        message: ErrString,
    },

    Multiple(MultiDisplay),

    Context {
        context: ErrorContext,
        source: Box<RecaError>,
    },
}

impl RecaError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            Self::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            Self::Variable { .. } => ErrorCode::Variable,
            Self::ModelSpec { .. } => ErrorCode::ModelSpec,
            Self::Fit { .. } => ErrorCode::Fit,
            Self::Search { .. } => ErrorCode::Search,
            Self::Multiple(_) => ErrorCode::Multiple,
            Self::Context { .. } => ErrorCode::Context,
        }
    }

    pub fn model_spec(token: impl Into<ErrString>, message: impl Into<ErrString>) -> Self {
        RecaError::ModelSpec {
            token: token.into(),
            message: message.into(),
        }
    }

    /// The offending token for [RecaError::ModelSpec] errors.
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::ModelSpec { token, .. } => Some(token),
            Self::Context { source, .. } => source.token(),
            _ => None,
        }
    }

    pub fn with_context(self, msg: impl Into<String>) -> Self {
        RecaError::Context {
            context: ErrorContext::new(msg),
            source: Box::new(self),
        }
    }
}

impl Display for RecaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { message } => write!(f, "Invalid configuration: {}", message),
            Self::InvalidParameter { message } => write!(f, "Invalid parameter: {}", message),
            Self::Variable { message } => write!(f, "Variable error: {}", message),
            Self::ModelSpec { token, message } => {
                write!(f, "Model spec error at '{}': {}", token, message)
            }
            Self::Fit { message } => write!(f, "Fit error: {}", message),
            Self::Search { message } => write!(f, "Search error: {}", message),
            Self::Multiple(m) => write!(f, "Multiple errors:\n{}", m),
            Self::Context {
                context, source, ..
            } => write!(f, "{}\nCaused by: {}", context, source),
        }
    }
}

impl std::error::Error for RecaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Context { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ErrorContext {
    message: String,
}

impl ErrorContext {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ErrorContext {}

#[derive(Debug)]
pub struct MultiDisplay(Vec<RecaError>);

impl MultiDisplay {
    pub fn errors(&self) -> &[RecaError] {
        &self.0
    }
}

impl Display for MultiDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{}] {} (code: {:?})", i, e, e.code())?;
        }
        Ok(())
    }
}

impl From<Vec<RecaError>> for MultiDisplay {
    fn from(v: Vec<RecaError>) -> Self {
        Self(v)
    }
}

// Ergonomic Result extensions (context)
pub trait ResultExt<T> {
    fn context(self, msg: impl Into<String>) -> RecaResult<T>;
    fn with_context<F: FnOnce() -> String>(self, f: F) -> RecaResult<T>;
}

impl<T, E: Into<RecaError>> ResultExt<T> for Result<T, E> {
    fn context(self, msg: impl Into<String>) -> RecaResult<T> {
        self.map_err(|e| e.into().with_context(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> RecaResult<T> {
        self.map_err(|e| e.into().with_context(f()))
    }
}

// Macros: err, bail, ensure
#[doc(hidden)]
pub mod __private {
    #[inline]
    #[cold]
    #[must_use]
    pub fn must_use<E>(e: E) -> E {
        e
    }
}

#[macro_export]
macro_rules! reca_err {
    (InvalidConfig: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::RecaError::InvalidConfig { message: format!($fmt, $($arg),*).into() })
    };
    (InvalidParameter: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::RecaError::InvalidParameter { message: format!($fmt, $($arg),*).into() })
    };
    (Variable: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::RecaError::Variable { message: format!($fmt, $($arg),*).into() })
    };
    (Fit: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::RecaError::Fit { message: format!($fmt, $($arg),*).into() })
    };
    (Search: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::RecaError::Search { message: format!($fmt, $($arg),*).into() })
    };
    ($variant:ident: $msg:expr $(,)?) => {{
        // Fallback to Search with custom message if variant omitted
        $crate::__private::must_use($crate::RecaError::Search { message: $msg.into() })
    }};
}

#[macro_export]
macro_rules! reca_bail {
    ($($tt:tt)+) => { return Err($crate::reca_err!($($tt)+)) };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($tt:tt)+) => {
        if !$cond { $crate::reca_bail!($($tt)+); }
    };
}
