use crate::delivery::Delivery;
use crate::{Capture, Error, ExportConfig, ExportError, ExportReport, ExportRequest, Exporter, Result, Stage};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    LoadHtml(String, oneshot::Sender<Result<()>>),
    Export(ExportRequest, oneshot::Sender<std::result::Result<ExportReport, ExportError>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async-friendly exporter backed by a dedicated worker thread.
///
/// The worker thread owns the capture backend and runs one export at a time,
/// so a document can never be swapped out while it is being captured.
/// Callers `await` the result without blocking their runtime. Clones share
/// the same worker.
#[derive(Clone)]
pub struct ExportWorker {
    cmd_tx: Sender<Command>,
}

impl ExportWorker {
    /// Start a worker with the preferred capture backend
    pub async fn new<D>(config: ExportConfig, delivery: D) -> Result<Self>
    where
        D: Delivery + Send + 'static,
    {
        Self::with_capturer(config, delivery, crate::new_capturer).await
    }

    /// Start a worker whose capture backend is built by `make_capturer` on
    /// the worker thread, so the backend itself need not be `Send`.
    pub async fn with_capturer<C, D, F>(config: ExportConfig, delivery: D, make_capturer: F) -> Result<Self>
    where
        C: Capture + 'static,
        D: Delivery + Send + 'static,
        F: FnOnce(&ExportConfig) -> Result<C> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::spawn(move || {
            let exporter = match make_capturer(&config).and_then(|c| Exporter::new(c, delivery, config)) {
                Ok(e) => e,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let _ = init_tx.send(Ok(()));
            run(exporter, cmd_rx);
        });

        init_rx
            .await
            .map_err(|e| Error::WorkerError(format!("init canceled: {}", e)))??;

        Ok(Self { cmd_tx })
    }

    /// Replace the document the worker captures from
    pub async fn load_html(&self, html: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::LoadHtml(html.to_string(), tx))?;
        rx.await
            .map_err(|e| Error::WorkerError(format!("LoadHtml canceled: {}", e)))?
    }

    /// Run the export pipeline on the currently loaded document
    pub async fn export(&self, request: ExportRequest) -> std::result::Result<ExportReport, ExportError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Export(request, tx))
            .map_err(|e| ExportError::new(Stage::Capture, e))?;
        rx.await.map_err(|e| {
            ExportError::new(Stage::Capture, Error::WorkerError(format!("Export canceled: {}", e)))
        })?
    }

    /// Load `html` and export it. Both steps run back to back on the worker.
    pub async fn export_html(&self, html: &str, request: ExportRequest) -> std::result::Result<ExportReport, ExportError> {
        self.load_html(html)
            .await
            .map_err(|e| ExportError::new(Stage::Capture, e))?;
        self.export(request).await
    }

    /// Shut down the worker and release the capture backend
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close(tx))?;
        rx.await
            .map_err(|e| Error::WorkerError(format!("Close canceled: {}", e)))?
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| Error::WorkerError("worker thread has stopped".into()))
    }
}

fn run<C: Capture, D: Delivery>(mut exporter: Exporter<C, D>, cmd_rx: mpsc::Receiver<Command>) {
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            Command::LoadHtml(html, resp) => {
                let res = exporter.capturer_mut().load_html(&html);
                let _ = resp.send(res);
            }
            Command::Export(request, resp) => {
                let res = exporter.export(&request);
                let _ = resp.send(res);
            }
            Command::Close(resp) => {
                let res = exporter.into_capturer().close();
                let _ = resp.send(res);
                return;
            }
        }
    }
}

#[cfg(all(test, feature = "html"))]
mod tests {
    use super::*;
    use crate::html::HtmlCapture;
    use crate::MemoryDelivery;
    use std::sync::Arc;

    const PREVIEW: &str = r#"<div id="invoice-preview"><h1>Quotation</h1><div style="height: 1500px"></div></div>"#;

    #[tokio::test]
    async fn exports_on_worker_thread() {
        let delivery = Arc::new(MemoryDelivery::new());
        let worker = ExportWorker::new(ExportConfig::default(), delivery.clone()).await.unwrap();

        let report = worker.export_html(PREVIEW, ExportRequest::new("Q-7", "Acme")).await.unwrap();
        assert_eq!(report.file_name, "Q-7_Acme.pdf");
        assert!(report.page_count >= 1);
        assert_eq!(delivery.len(), 1);

        worker.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_element_reports_capture_stage() {
        let delivery = Arc::new(MemoryDelivery::new());
        let worker = ExportWorker::with_capturer(ExportConfig::default(), delivery.clone(), |_| {
            Ok(HtmlCapture::with_html("<div id=other></div>"))
        })
        .await
        .unwrap();

        let err = worker.export(ExportRequest::new("Q-7", "Acme")).await.unwrap_err();
        assert_eq!(err.stage, Stage::Capture);
        assert!(delivery.is_empty());
        worker.close().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_fails_at_startup() {
        let config = ExportConfig { scale: 0.0, ..Default::default() };
        let res = ExportWorker::new(config, MemoryDelivery::new()).await;
        assert!(matches!(res, Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn closed_worker_rejects_commands() {
        let worker = ExportWorker::new(ExportConfig::default(), MemoryDelivery::new()).await.unwrap();
        let handle = worker.clone();
        worker.close().await.unwrap();

        let err = handle.load_html(PREVIEW).await.unwrap_err();
        assert!(matches!(err, Error::WorkerError(_)));
    }
}
