pub mod cv;
pub mod jobs;
pub mod matches;

pub use cv::{CvFile, CvStatus, UploadPlan};
pub use jobs::JobListing;
pub use matches::{JobMatch, MatchesPayload};
