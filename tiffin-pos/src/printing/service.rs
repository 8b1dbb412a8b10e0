//! Print service
//!
//! Single entry point for the UI: render a ticket, then hand it to the
//! transmission pipeline. Errors come back as [`PrintError`]; convert to
//! [`shared::AppError`] to decide between "retry" and "continue without
//! printing".

use shared::order::{OrderSnapshot, PreviousOrderSnapshot};
use tiffin_printer::{
    ConnectionManager, PrintError, PrintResult, TransmissionError, TransmissionPipeline,
    TransmitReport,
};
use tracing::{info, instrument};

use super::diff::KotLine;
use super::kitchen::{KitchenTicket, KitchenTicketRenderer};
use super::receipt::ReceiptRenderer;
use super::test_page::TestPageRenderer;
use crate::core::Config;

/// Outcome of a printed kitchen ticket
#[derive(Debug, Clone)]
pub struct KotReport {
    pub transmit: TransmitReport,
    pub lines: Vec<KotLine>,
    pub total_items: u32,
    pub additional: bool,
}

pub struct PrintService {
    pipeline: TransmissionPipeline,
    receipts: ReceiptRenderer,
    kitchen: KitchenTicketRenderer,
    test_page: TestPageRenderer,
}

impl PrintService {
    pub fn new(manager: ConnectionManager, config: &Config) -> Self {
        Self {
            pipeline: TransmissionPipeline::new(manager, config.transmit_config()),
            receipts: ReceiptRenderer::new(
                config.paper_width,
                config.timezone,
                config.outlet.clone(),
            ),
            kitchen: KitchenTicketRenderer::new(config.paper_width, config.timezone),
            test_page: TestPageRenderer::new(
                config.paper_width,
                config.timezone,
                config.outlet.name.clone(),
            ),
        }
    }

    pub fn manager(&self) -> &ConnectionManager {
        self.pipeline.manager()
    }

    #[instrument(skip_all, fields(order = %order.order_number))]
    pub async fn print_receipt(&self, order: &OrderSnapshot) -> PrintResult<TransmitReport> {
        let job = self.receipts.render(order)?;
        let report = self.pipeline.transmit(job).await?;
        info!(bytes = report.bytes, "Receipt printed");
        Ok(report)
    }

    /// Print a kitchen ticket; pass the last printed snapshot for an
    /// additional ticket
    #[instrument(skip_all, fields(order = %order.order_number, additional = previous.is_some()))]
    pub async fn print_kot(
        &self,
        order: &OrderSnapshot,
        previous: Option<&PreviousOrderSnapshot>,
    ) -> PrintResult<KotReport> {
        let KitchenTicket {
            job,
            lines,
            total_items,
            additional,
        } = self.kitchen.render(order, previous);

        let transmit = self.pipeline.transmit(job).await?;
        info!(lines = lines.len(), total_items, "Kitchen ticket printed");
        Ok(KotReport {
            transmit,
            lines,
            total_items,
            additional,
        })
    }

    #[instrument(skip_all)]
    pub async fn print_test_page(&self) -> PrintResult<TransmitReport> {
        let printer = self
            .manager()
            .connected_device()
            .ok_or(PrintError::from(TransmissionError::NotConnected))?;

        let job = self
            .test_page
            .render(&printer, chrono::Utc::now().timestamp_millis());
        self.pipeline.transmit(job).await
    }
}
