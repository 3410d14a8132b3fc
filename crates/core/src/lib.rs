pub mod audit;
pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod workflow;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use cache::{CollectionKey, OrderCollectionCache};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::order::{
    DeliveryTimeSlot, Order, OrderId, OrderItem, OrderStatus, OrderSummary, StatusUpdate,
};
pub use errors::{OrderApiError, ValidationError, WorkflowError};
pub use ports::{
    CacheInvalidator, Navigator, Notification, Notifier, OrderApi, OrderCollectionSource,
    RecordingPresenter, Severity,
};
pub use workflow::{
    classify, DeleteOutcome, LoadOutcome, MutationOutcome, OrderWorkflow, SideData, SkipReason,
    TransitionRequirement, WorkflowCollaborators, WorkflowSnapshot, WorkflowState,
};
