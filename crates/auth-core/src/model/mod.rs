mod context;

pub use context::{Context, ContextUpdate, FlowAction, FlowParams, ProfileDetails};
