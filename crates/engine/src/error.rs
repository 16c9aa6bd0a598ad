use thiserror::Error;

/// Broad class of a command failure. Every class is recoverable; the event
/// loop keeps running whatever a single invocation returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing arguments, wrong time window, wrong channel.
    Validation,
    /// Admin-only command from a non-admin, or an unregistered user.
    Authorization,
    /// Duplicate registration, activity already submitted, and similar.
    StateConflict,
    /// Maintenance mode.
    Unavailable,
    Storage,
    Transport,
}

/// Failure of a command handler or session. `Display` is the text shown to
/// the user.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    Authorization { message: String },

    #[error("{message}")]
    StateConflict { message: String },

    #[error("{message}")]
    Unavailable { message: String },

    #[error("error de almacenamiento: {0}")]
    Store(aula_store::Error),

    #[error("error de transporte: {0}")]
    Transport(#[from] aula_channels::Error),
}

impl CommandError {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::StateConflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Not enough arguments for the command.
    #[must_use]
    pub fn missing_arguments() -> Self {
        Self::validation("El mensaje no tiene contenido suficiente para este comando.")
    }

    #[must_use]
    pub fn not_admin() -> Self {
        Self::authorization("No autorizado! Este comando es solo para el docente.")
    }

    #[must_use]
    pub fn wrong_channel() -> Self {
        Self::validation("Este comando no está disponible en este canal.")
    }

    #[must_use]
    pub fn maintenance() -> Self {
        Self::unavailable("El bot está en mantenimiento, intenta más tarde.")
    }

    #[must_use]
    pub fn invalid_user_status() -> Self {
        Self::validation(
            "El comando no pudo registrarse, verificar:\n\
             1) Usar solo cliente de Discord para computadora.\n\
             2) Verificar que tu status sea Online (punto verde).\n\
             3) Esperar 5+ minutos despues de abrir o cerrar el cliente de Discord y reintentar.",
        )
    }

    #[must_use]
    pub fn quiz(details: impl std::fmt::Display) -> Self {
        Self::validation(format!("Quiz error! {details}"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::StateConflict { .. } => ErrorKind::StateConflict,
            Self::Unavailable { .. } => ErrorKind::Unavailable,
            Self::Store(_) => ErrorKind::Storage,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }
}

impl From<aula_store::Error> for CommandError {
    fn from(err: aula_store::Error) -> Self {
        use aula_store::Error as E;
        match err {
            E::NotRegistered { .. } => Self::authorization(
                "No registrado, para registrar enviar comando \"register <CODIGO-UPB>\"",
            ),
            E::AlreadyRegistered { what } => Self::state_conflict(format!("Ya registrado: {what}")),
            E::AlreadySubmitted { activity } => {
                Self::state_conflict(format!("La actividad del {activity} ya fue presentada."))
            },
            E::AlreadyExists { what } => Self::state_conflict(format!("Ya existe: {what}")),
            E::NotFound { what } => Self::validation(format!("No encontrado: {what}")),
            other => Self::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CommandError>;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, aula_common::UserId, chrono::NaiveDate};

    #[test]
    fn store_errors_map_onto_taxonomy() {
        let cases = [
            (
                aula_store::Error::not_registered(&UserId::new("u1")),
                ErrorKind::Authorization,
            ),
            (
                aula_store::Error::already_registered("user u1"),
                ErrorKind::StateConflict,
            ),
            (
                aula_store::Error::AlreadySubmitted {
                    activity: NaiveDate::from_ymd_opt(2021, 9, 6).unwrap(),
                },
                ErrorKind::StateConflict,
            ),
            (
                aula_store::Error::already_exists("session"),
                ErrorKind::StateConflict,
            ),
            (aula_store::Error::not_found("activity"), ErrorKind::Validation),
            (aula_store::Error::message("disk full"), ErrorKind::Storage),
        ];
        for (err, kind) in cases {
            assert_eq!(CommandError::from(err).kind(), kind);
        }
    }

    #[test]
    fn display_is_the_user_facing_text() {
        let err = CommandError::quiz("No students online to start the quiz!");
        assert_eq!(
            err.to_string(),
            "Quiz error! No students online to start the quiz!"
        );
        assert!(CommandError::not_admin().to_string().starts_with("No autorizado"));
    }

    #[test]
    fn transport_errors_convert() {
        let err: CommandError = aula_channels::Error::unavailable("offline").into();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
