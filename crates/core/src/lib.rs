pub mod capture;
pub mod composition;
pub mod config;
pub mod events;
pub mod media;
pub mod metrics;
pub mod pipeline;
pub mod quota;
pub mod store;
pub mod testing;
pub mod ticket;

pub use capture::{CaptureError, ImageCapture, RasterTicketRenderer, TicketPresenter};
pub use composition::{
    CompositionApi, CompositionClient, CompositionError, CompositionPath, CompositionResult,
    HttpCompositionApi,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use events::{EventBroadcaster, PipelineEvent};
pub use media::{GenerationRequest, ImageRef, MediaError, MediaKind, MediaOrigin, PickedMedia};
pub use pipeline::{
    Clock, PipelineConfig, PipelineError, PipelineServices, PipelineState, PipelineStatus,
    QuotaStatus, SystemClock, TicketPipeline,
};
pub use quota::{QuotaGate, QuotaPolicy, QuotaState, QuotaTier};
pub use store::{ProfileStore, SqliteProfileStore, StoreError};
pub use ticket::{LuckyNumber, TicketComposer, TicketMessage, TicketRecord, TicketTemplate};
