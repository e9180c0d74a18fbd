mod images;
mod metadata;
pub mod relay;

pub use images::{DEFAULT_IMAGE_CONTENT_TYPE, ImageService, ImageStream};
pub use metadata::{MISSING_CREDENTIAL_MESSAGE, MetadataService};
pub use relay::{RelayError, RelayOutcome};
