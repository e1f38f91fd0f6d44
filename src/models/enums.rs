use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A value outside one of the fixed enumerated vocabularies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {field} value: {value:?}")]
pub struct DomainError {
    pub field: &'static str,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DomainError {
                        field: stringify!($name),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(UserRole {
    Doctor => "doctor",
    Patient => "patient",
});

str_enum!(Gender {
    Female => "female",
    Male => "male",
});

str_enum!(ContactChannel {
    Phone => "phone",
    Email => "email",
    Address => "address",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    InProgress => "in_progress",
    Finished => "finished",
    Missed => "missed",
});

str_enum!(DiagnosisStatus {
    Thesis => "thesis",
    Verify => "verify",
    Final => "final",
});
