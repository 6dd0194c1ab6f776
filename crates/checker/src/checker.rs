use crate::context::ResourceContext;
use crate::error::{ErrorKind, Result};
use crate::events::{CheckEvent, CheckOutcome};
use crate::recovery::{RecoveryOutcome, recover};
use crate::session::CheckSession;
use crate::settings::CheckerSettings;
use crate::source::ManifestSource;
use async_stream::stream;
use exn::{OptionExt, ResultExt};
use futures::{Stream, StreamExt};
use resman_config::Config;
use resman_manifest::{FramedCodec, ManifestCodec};
use resman_storage::backend::{LocalBackend, ReadOnlyBackend};
use resman_storage::BackendHandle;
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;

/// The three storage areas, all confirmed present.
struct Areas {
    remote: BackendHandle,
    read_only: BackendHandle,
    read_write: BackendHandle,
}
impl Areas {
    fn get(&self, source: ManifestSource) -> &BackendHandle {
        match source {
            ManifestSource::Target => &self.remote,
            ManifestSource::ReadOnly => &self.read_only,
            ManifestSource::ReadWrite => &self.read_write,
        }
    }
}

/// Decides which resources are usable, which must be downloaded and which
/// must be purged.
///
/// Results of each successful check replace the snapshot held by the
/// checker's [`ResourceContext`].
///
/// # Examples
///
/// ```no_run
/// use futures::StreamExt;
/// use resman_checker::{CheckEvent, ResourceChecker};
/// use resman_config::Config;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let checker = ResourceChecker::from_config(&Config::load(None)?)?;
/// let mut events = std::pin::pin!(checker.check(Some("hd")));
/// while let Some(event) = events.next().await {
///     if let CheckEvent::ResourceNeedsUpdate(request) = event? {
///         println!("{} needs {} bytes", request.name, request.compressed_length);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct ResourceChecker {
    remote: Option<BackendHandle>,
    read_only: Option<BackendHandle>,
    read_write: Option<BackendHandle>,
    codec: Arc<dyn ManifestCodec>,
    settings: CheckerSettings,
    context: Arc<ResourceContext>,
}

impl Default for ResourceChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceChecker {
    /// A checker with no storage areas, the [`FramedCodec`] and default
    /// settings.
    pub fn new() -> Self {
        Self {
            remote: None,
            read_only: None,
            read_write: None,
            codec: Arc::new(FramedCodec::new()),
            settings: CheckerSettings::default(),
            context: Arc::new(ResourceContext::new()),
        }
    }

    /// Build a checker on local directories.
    ///
    /// Every root must be configured; a directory that does not exist yet is
    /// created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let area = |name: &str, root: Option<&Path>| -> Result<BackendHandle> {
            let root = root.ok_or_raise(|| ErrorKind::Configuration(format!("{name}_root is not set")))?;
            let backend = LocalBackend::new(name, root)
                .or_raise(|| ErrorKind::Configuration(format!("{name}_root {} is unusable", root.display())))?;
            Ok(Arc::new(backend))
        };
        Ok(Self::new()
            .with_settings(CheckerSettings::from(config))
            .with_remote(area("remote", config.remote_root.as_deref())?)
            .with_read_only(area("read_only", config.read_only_root.as_deref())?)
            .with_read_write(area("read_write", config.read_write_root.as_deref())?))
    }

    /// Where the authoritative manifest is loaded from.
    pub fn with_remote(mut self, backend: BackendHandle) -> Self {
        self.remote = Some(backend);
        self
    }

    /// The immutable storage area. It is wrapped in a [`ReadOnlyBackend`].
    pub fn with_read_only(mut self, backend: BackendHandle) -> Self {
        self.read_only = Some(Arc::new(ReadOnlyBackend::new(backend)));
        self
    }

    pub fn with_read_write(mut self, backend: BackendHandle) -> Self {
        self.read_write = Some(backend);
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn ManifestCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_settings(mut self, settings: CheckerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Share a context with other owners instead of the checker's own.
    pub fn with_context(mut self, context: Arc<ResourceContext>) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &Arc<ResourceContext> {
        &self.context
    }

    pub fn settings(&self) -> &CheckerSettings {
        &self.settings
    }

    fn areas(&self) -> Result<Areas> {
        let missing = |name: &str| ErrorKind::Configuration(format!("no {name} storage area"));
        if self.settings.manifest_file.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Configuration("manifest file name is empty".to_string()));
        }
        if self.settings.resource_extension.is_empty() {
            exn::bail!(ErrorKind::Configuration("resource extension is empty".to_string()));
        }
        Ok(Areas {
            remote: self.remote.clone().ok_or_raise(|| missing("remote"))?,
            read_only: self.read_only.clone().ok_or_raise(|| missing("read-only"))?,
            read_write: self.read_write.clone().ok_or_raise(|| missing("read-write"))?,
        })
    }

    /// Run a check for `variant`, streaming [`CheckEvent`]s.
    ///
    /// Configuration is verified before anything touches storage. The three
    /// manifests load concurrently on spawned tasks, so this must be polled
    /// inside a Tokio runtime. A load that never completes keeps the stream
    /// open; callers wanting a deadline wrap their storage backends.
    ///
    /// The stream always ends with either [`CheckEvent::Complete`] or an
    /// `Err`, including when a load task panics.
    pub fn check<'a>(&'a self, variant: Option<&'a str>) -> impl Stream<Item = Result<CheckEvent>> + Send + 'a {
        // Parenthesised so rustfmt still formats the body.
        stream!({
            let areas = match self.areas() {
                Ok(areas) => areas,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            tracing::info!(variant, "Checking resources");
            yield Ok(CheckEvent::Started);

            let recovery =
                recover(areas.read_write.as_ref(), &self.settings.manifest_file, &self.settings.backup_file).await;
            yield Ok(CheckEvent::Recovered(recovery));

            let (tx, mut rx) = unbounded_channel();
            let session = Arc::new(CheckSession::new(
                variant.map(str::to_string),
                self.settings.clone(),
                self.codec.clone(),
                areas.read_write.clone(),
                self.context.clone(),
                recovery,
                tx,
            ));
            let loads: Vec<_> = ManifestSource::ALL
                .into_iter()
                .map(|source| {
                    let session = session.clone();
                    let backend = areas.get(source).clone();
                    let path = self.settings.manifest_file.clone();
                    let handle = tokio::spawn(async move {
                        let loaded = backend.read(&path).await;
                        if let Err(e) = session.complete(source, loaded).await {
                            session.emit(Err(e));
                        }
                    });
                    (source, handle)
                })
                .collect();
            // The channel closes once every task has dropped its session.
            drop(session);

            while let Some(event) = rx.recv().await {
                let finished = matches!(event, Err(_) | Ok(CheckEvent::Complete(_)));
                yield event;
                if finished {
                    return;
                }
            }

            // Every sender is gone without a verdict, so a load task died.
            for (source, handle) in loads {
                if let Err(e) = handle.await.or_raise(|| ErrorKind::LoadAborted(source)) {
                    tracing::error!(%source, error = ?e, "Manifest load task died");
                    yield Err(e);
                    return;
                }
            }
            yield Err(exn::Exn::from(ErrorKind::ProtocolViolation("check ended without completing".to_string())));
        })
    }

    /// Run a check and collect everything it emitted.
    pub async fn check_and_collect(&self, variant: Option<&str>) -> Result<CheckOutcome> {
        let mut events = pin!(self.check(variant));
        let mut recovery = RecoveryOutcome::Clean;
        let mut updates = Vec::new();
        while let Some(event) = events.next().await {
            match event? {
                CheckEvent::Started => {},
                CheckEvent::Recovered(outcome) => recovery = outcome,
                CheckEvent::ResourceNeedsUpdate(request) => updates.push(request),
                CheckEvent::Complete(summary) => return Ok(CheckOutcome { recovery, updates, summary }),
            }
        }
        exn::bail!(ErrorKind::ProtocolViolation("check ended without completing".to_string()))
    }
}
