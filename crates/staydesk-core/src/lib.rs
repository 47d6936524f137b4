// Admin client core: endpoints, session, gate, forms and views
pub mod config;
pub mod endpoints;
pub mod error;
pub mod forms;
pub mod gate;
pub mod models;
pub mod persist;
pub mod session;
pub mod slice;
pub mod tags;
pub mod toast;
pub mod views;

pub use config::Config;
pub use endpoints::{Mutation, Query};
pub use error::Error;
pub use forms::{FormValue, FormValues, Rule, Schema, SubmitOutcome, ValidationErrors};
pub use gate::{gate, GateDecision};
pub use models::{BookingStatus, Credentials, EnquiryStatus, ListParams, Resource, ReviewStatus};
pub use persist::{PersistedSlice, PlanSelection};
pub use session::{Session, SessionRepository, StoreSessionRepository, StoredSession};
pub use slice::ApiSlice;
pub use tags::TagKind;
pub use toast::{Notifier, Toast, ToastKind, ToastLog};
pub use views::{DetailView, ListView, ViewState};

/// Result type alias for the core crate
pub type Result<T> = std::result::Result<T, Error>;
