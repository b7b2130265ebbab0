//! Strongly typed string identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrows the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` when the identifier is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

string_id!(
    /// Identifier of an offer campaign.
    OfferItemId
);
string_id!(
    /// Identifier of one blogger's participation in one campaign.
    AssigneeId
);
string_id!(
    /// Identifier of a campaign schedule.
    ScheduleId
);
string_id!(
    /// Identifier of one submission and its verdict.
    ExaminationId
);
string_id!(
    /// Identifier of a questionnaire question.
    QuestionId
);
string_id!(
    /// Externally assigned blogger identifier.
    AmebaId
);
string_id!(
    /// Catalog item identifier.
    ItemId
);
string_id!(
    /// Catalog DF item identifier.
    DfItemId
);
string_id!(
    /// Coupon banner identifier.
    BannerId
);
string_id!(
    /// Identifier of the submitted draft or article.
    EntryId
);
