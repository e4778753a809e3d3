use std::fmt;

/// Steps of an order run, in the order they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPhase {
    LoadingDealership,
    QueryingInventory,
    ComparingVins,
    LookingUpVins,
    CreatingFolders,
    GeneratingQrCodes,
    WritingCsv,
    RecordingOrder,
}

impl OrderPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPhase::LoadingDealership => "loading_dealership",
            OrderPhase::QueryingInventory => "querying_inventory",
            OrderPhase::ComparingVins => "comparing_vins",
            OrderPhase::LookingUpVins => "looking_up_vins",
            OrderPhase::CreatingFolders => "creating_folders",
            OrderPhase::GeneratingQrCodes => "generating_qr_codes",
            OrderPhase::WritingCsv => "writing_csv",
            OrderPhase::RecordingOrder => "recording_order",
        }
    }
}

impl fmt::Display for OrderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the order processor.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Phase {
        dealership: String,
        phase: OrderPhase,
        message: String,
    },
    Completed {
        dealership: String,
        order_number: Option<String>,
        vehicles: usize,
        qr_codes: usize,
    },
    Failed {
        dealership: String,
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes progress to the log. Used by the CLI.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase {
                dealership,
                phase,
                message,
            } => log::info!("[{}] {}: {}", dealership, phase, message),
            ProgressEvent::Completed {
                dealership,
                order_number,
                vehicles,
                qr_codes,
            } => log::info!(
                "[{}] Order {} completed: {} vehicles, {} QR codes",
                dealership,
                order_number.as_deref().unwrap_or("(unnumbered)"),
                vehicles,
                qr_codes
            ),
            ProgressEvent::Failed { dealership, error } => {
                log::error!("[{}] Order failed: {}", dealership, error)
            }
        }
    }
}
