//! Record types shared by the cache and discovery layers.

mod model;
mod profile;

pub use model::{
    CAPABILITY_INFERENCE_PROFILE, CAPABILITY_ON_DEMAND, CAPABILITY_PROVISIONED,
    CAPABILITY_STREAMING, ModelRecord, base_model_id,
};
pub use profile::{InferenceProfileRecord, ModelReference};
