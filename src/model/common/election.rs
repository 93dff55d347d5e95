use std::fmt::{Display, Formatter};

use mongodb::bson::Bson;
#[cfg(test)]
use mongodb::bson::to_bson;
use rocket::form::{self, FromFormField, ValueField};
use serde::{Deserialize, Serialize};

/// States in the election lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    /// Created, visible, not yet accepting votes.
    Upcoming,
    /// Accepting votes.
    Active,
    /// Closed; results are readable.
    Completed,
}

impl ElectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl Default for ElectionStatus {
    fn default() -> Self {
        Self::Upcoming
    }
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        Bson::String(status.as_str().to_string())
    }
}

#[rocket::async_trait]
impl<'r> FromFormField<'r> for ElectionStatus {
    fn from_value(field: ValueField<'r>) -> form::Result<'r, Self> {
        match field.value {
            "upcoming" => Ok(Self::Upcoming),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            _ => Err(form::Error::validation("expected upcoming, active or completed").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_lowercase() {
        assert_eq!(to_bson(&ElectionStatus::Active).unwrap(), Bson::from("active"));
        assert_eq!(Bson::from(ElectionStatus::Completed), Bson::from("completed"));
        assert_eq!(<ElectionStatus as Default>::default(), ElectionStatus::Upcoming);
        assert_eq!(ElectionStatus::Upcoming.to_string(), "upcoming");
    }
}
