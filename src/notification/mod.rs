//! # Notification delivery
//!
//! This module carries resolved alerts from the router to the per-channel
//! delivery gateways. The core does not speak SMTP or HTTP itself: each
//! transport's gateway is an external collaborator behind the
//! [`ChannelGateway`] trait, and the core's responsibility ends at
//! rendering the message and handing it over.
//!
//! ## Core components
//!
//! - **`ChannelQueues`**: one bounded queue per transport; the router's
//!   sending half.
//! - **`ChannelWorker`**: a single-consumer loop per transport — pop one
//!   alert, render it, deliver it, report the outcome back for
//!   bookkeeping. There is no redelivery; a worker that dies is restarted
//!   by external process supervision.
//! - **`TemplateService`**: renders message bodies from typed contexts
//!   with strict undefined-variable behaviour.

pub mod gateway;
pub mod queue;
pub mod template;
pub mod worker;

pub use gateway::{ChannelGateway, GatewayError, LoggingGateway};
pub use queue::ChannelQueues;
pub use template::{TemplateService, TemplateServiceError};
pub use worker::ChannelWorker;
