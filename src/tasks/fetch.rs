use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::{Client, Url};
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::bitmap::Image;
use crate::config::FetchOptions;
use crate::error::{Error, Result};
use crate::events::ViewerEvent;
use crate::presentation::FetchRequest;

/// Source of encoded image bytes.
pub trait ImageSource: Send + Sync + 'static {
    fn fetch(&self, url: Url) -> BoxFuture<'static, Result<Vec<u8>>>;
}

/// Plain HTTP(S) GET; any non-success status is a failure.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    pub fn new(options: &FetchOptions) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: Url) -> BoxFuture<'static, Result<Vec<u8>>> {
        let client = self.client.clone();
        async move {
            let response = client.get(url.clone()).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Status { status, url });
            }
            Ok(response.bytes().await?.to_vec())
        }
        .boxed()
    }
}

/// Fetch `url` and decode it off the event loop.
pub async fn load_full_image(source: &dyn ImageSource, url: Url) -> Result<Image> {
    let bytes = source.fetch(url).await?;
    debug!(len = bytes.len(), "full image bytes received");
    tokio::task::spawn_blocking(move || Image::decode(&bytes)).await?
}

/// Spawn the fetch for `request` and post the outcome back to the event loop
/// as [`ViewerEvent::FullImage`]. Nothing is posted once the request's token
/// is cancelled.
pub fn spawn(
    source: Arc<dyn ImageSource>,
    request: FetchRequest,
    to_viewer: Sender<ViewerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(run(source, request, to_viewer))
}

#[instrument(skip_all, fields(url = %request.url, ticket = request.ticket.0))]
async fn run(
    source: Arc<dyn ImageSource>,
    request: FetchRequest,
    to_viewer: Sender<ViewerEvent>,
) {
    let FetchRequest {
        ticket,
        url,
        cancel,
    } = request;
    let result = select! {
        _ = cancel.cancelled() => {
            debug!("full image fetch cancelled");
            return;
        }
        result = load_full_image(source.as_ref(), url) => result,
    };
    if let Err(err) = &result {
        debug!(error = %err, "full image fetch failed");
    }
    if cancel.is_cancelled() {
        return;
    }
    if to_viewer
        .send(ViewerEvent::FullImage { ticket, result })
        .await
        .is_err()
    {
        debug!("viewer gone; full image result dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::FetchTicket;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    struct StaticSource(Option<Vec<u8>>);

    impl ImageSource for StaticSource {
        fn fetch(&self, url: Url) -> BoxFuture<'static, Result<Vec<u8>>> {
            let bytes = self.0.clone();
            async move {
                match bytes {
                    Some(bytes) => Ok(bytes),
                    None => Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        url.to_string(),
                    ))),
                }
            }
            .boxed()
        }
    }

    struct PendingSource;

    impl ImageSource for PendingSource {
        fn fetch(&self, _url: Url) -> BoxFuture<'static, Result<Vec<u8>>> {
            futures::future::pending().boxed()
        }
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([1, 2, 3, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn request(ticket: u64) -> FetchRequest {
        FetchRequest {
            ticket: FetchTicket(ticket),
            url: Url::parse("https://example.invalid/full.png").unwrap(),
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn decodes_fetched_bytes() {
        let source = StaticSource(Some(png_bytes(6, 4)));
        let url = Url::parse("https://example.invalid/a.png").unwrap();
        let img = load_full_image(&source, url).await.unwrap();
        assert_eq!(img.size(), crate::geometry::Size::new(6.0, 4.0));
    }

    #[tokio::test]
    async fn failure_is_delivered_with_ticket() {
        let (tx, mut rx) = mpsc::channel(4);
        spawn(Arc::new(StaticSource(None)), request(7), tx);
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timeout waiting for fetch result")
            .expect("channel closed");
        match event {
            ViewerEvent::FullImage { ticket, result } => {
                assert_eq!(ticket, FetchTicket(7));
                assert!(result.is_err());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn result_for_closed_viewer_is_dropped() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let handle = spawn(Arc::new(StaticSource(Some(png_bytes(2, 2)))), request(3), tx);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("fetch task should finish once the viewer is gone")
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_fetch_posts_nothing() {
        let (tx, mut rx) = mpsc::channel(4);
        let req = request(1);
        let cancel = req.cancel.clone();
        let handle = spawn(Arc::new(PendingSource), req, tx);
        cancel.cancel();
        handle.await.unwrap();
        assert!(rx.recv().await.is_none(), "sender should be dropped without a result");
    }
}
