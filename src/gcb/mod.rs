//! Google Cloud Build: job model, template loading, REST client and polling.

pub mod build;
pub mod client;
pub mod wait;

pub use build::{
    load_build, Build, BuildOptions, BuildStatus, BuildStep, FileTemplateLoader, TemplateError,
    TemplateLoader,
};
pub use client::{AccessToken, BuildService, CloudBuildClient, GcbError};
pub use wait::wait_for_build;
