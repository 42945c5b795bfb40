//! Stable identifier types.
//!
//! Every entity in a workflow is addressed by a time-ordered UUID v7 wrapped
//! in a dedicated newtype, so a stage id can never be passed where a value id
//! is expected. Ids are what bindings store; display names never are.

use std::str::FromStr;

use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[derive(Debug, Display, From, Into)]
        #[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
        #[debug("{_0}")]
        #[display("{_0}")]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new time-ordered identifier.
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an identifier from an existing UUID.
            #[inline]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[inline]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::from_str(s)?))
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }
    };
}

define_id! {
    /// Unique identifier of a stored workflow.
    WorkflowId
}

define_id! {
    /// Unique identifier of a stage within a workflow.
    StageId
}

define_id! {
    /// Unique identifier of a value within a stage.
    ValueId
}

define_id! {
    /// Unique identifier of an extraction tool.
    ToolId
}

define_id! {
    /// Unique identifier of an uploaded or knowledge document.
    DocumentId
}
