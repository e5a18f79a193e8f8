//! Error types for command lookup and encoding.

use evetrace_sim::TraceError;

/// Errors that can occur when resolving or encoding a command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No command of that name exists in the catalogue.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// No register (or register alias) of that name exists.
    #[error("unknown register '{0}'")]
    UnknownRegister(String),

    /// The command was given too few or too many arguments.
    #[error("{command} expects {expected} argument(s), got {found}")]
    ArgumentCount {
        /// Command name.
        command: String,
        /// Accepted argument count, e.g. `2`, `1..=2` or `4+`.
        expected: String,
        /// Number of arguments supplied.
        found: usize,
    },

    /// An argument had the wrong kind for its parameter.
    #[error("{command}: argument '{param}' must be {expected}")]
    ArgumentKind {
        /// Command name.
        command: String,
        /// Parameter name.
        param: String,
        /// Expected argument kind.
        expected: &'static str,
    },

    /// A write was attempted on a read-only register.
    #[error("register {0} is read-only")]
    NotWritable(String),

    /// A read was attempted on a write-only register.
    #[error("register {0} is write-only")]
    NotReadable(String),

    /// A multi-word register access had the wrong number of words.
    #[error("register {register} holds {expected} word(s), got {found}")]
    WordCount {
        /// Register name.
        register: String,
        /// Number of 32-bit words in the register.
        expected: usize,
        /// Number of words supplied.
        found: usize,
    },

    /// The underlying trace failed.
    #[error(transparent)]
    Trace(#[from] TraceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_command() {
        let err = CommandError::UnknownCommand("CMD_FOO".to_string());
        assert_eq!(format!("{err}"), "unknown command 'CMD_FOO'");
    }

    #[test]
    fn display_argument_count() {
        let err = CommandError::ArgumentCount {
            command: "CMD_APPEND".into(),
            expected: "2".into(),
            found: 1,
        };
        assert_eq!(format!("{err}"), "CMD_APPEND expects 2 argument(s), got 1");
    }

    #[test]
    fn display_argument_kind() {
        let err = CommandError::ArgumentKind {
            command: "CMD_TEXT".into(),
            param: "s".into(),
            expected: "text",
        };
        assert_eq!(format!("{err}"), "CMD_TEXT: argument 's' must be text");
    }

    #[test]
    fn display_access_errors() {
        assert_eq!(
            CommandError::NotWritable("REG_ID".into()).to_string(),
            "register REG_ID is read-only"
        );
        assert_eq!(
            CommandError::NotReadable("REG_CMDB_WRITE".into()).to_string(),
            "register REG_CMDB_WRITE is write-only"
        );
    }

    #[test]
    fn trace_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "gone");
        let err: CommandError = TraceError::from(io).into();
        assert_eq!(err.to_string(), "trace I/O error: gone");
    }
}
