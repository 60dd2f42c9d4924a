//! Per-provider state threaded through every resource and data-source
//! operation.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::{HttpVpcClient, TagApi, VpcApi};
use crate::config::ProviderConfig;
use crate::error::{ProviderError, Scope};

/// Default wait budget for create, update, and delete.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Default console base URL.
pub const DEFAULT_CONSOLE_URL: &str = "https://cloud.ibm.com";

/// Wait budgets per lifecycle operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timeouts {
    /// Budget for create waits.
    pub create: Duration,
    /// Budget for update waits.
    pub update: Duration,
    /// Budget for delete waits.
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Clone)]
struct Clients {
    vpc: Arc<dyn VpcApi>,
    tags: Arc<dyn TagApi>,
}

/// Clients and settings shared by every operation.
///
/// When client construction fails the context still builds, and every
/// operation reports [`ProviderError::ClientInit`] on its first remote call.
#[derive(Clone)]
pub struct ProviderContext {
    clients: Result<Clients, String>,
    env_tags: Vec<String>,
    timeouts: Timeouts,
    poll_interval: Duration,
    console_url: String,
    cancel: CancellationToken,
}

impl ProviderContext {
    /// Builds a context around ready clients with default settings.
    #[must_use]
    pub fn new(vpc: Arc<dyn VpcApi>, tags: Arc<dyn TagApi>) -> Self {
        Self::with_clients(Ok(Clients { vpc, tags }))
    }

    /// Builds a context whose clients failed to initialise.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with_clients(Err(message.into()))
    }

    fn with_clients(clients: Result<Clients, String>) -> Self {
        Self {
            clients,
            env_tags: Vec::new(),
            timeouts: Timeouts::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            console_url: String::from(DEFAULT_CONSOLE_URL),
            cancel: CancellationToken::new(),
        }
    }

    /// Builds HTTP clients and settings from loaded configuration.
    #[must_use]
    pub fn from_config(config: &ProviderConfig) -> Self {
        let clients = config
            .validate()
            .map_err(|err| err.to_string())
            .and_then(|()| {
                HttpVpcClient::new(&config.api_key, config.endpoints())
                    .map_err(|err| err.to_string())
            })
            .map(|client| Clients {
                tags: Arc::new(client.tag_client()),
                vpc: Arc::new(client),
            });
        if let Err(message) = &clients {
            tracing::warn!(error = %message, "provider clients unavailable");
        }
        Self::with_clients(clients)
            .with_env_tags(config.env_tags())
            .with_timeouts(config.timeouts())
            .with_poll_interval(config.poll_interval())
            .with_console_url(config.console_url.clone())
    }

    /// Sets tags merged into every user tag sync.
    #[must_use]
    pub fn with_env_tags(mut self, tags: Vec<String>) -> Self {
        self.env_tags = tags;
        self
    }

    /// Sets wait budgets.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets the delay between status polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the console base URL.
    #[must_use]
    pub fn with_console_url(mut self, url: impl Into<String>) -> Self {
        self.console_url = url.into();
        self
    }

    /// Replaces the cancellation token observed by status waits.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the VPC client.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ClientInit`] when the clients failed to
    /// initialise.
    pub fn vpc(&self, scope: Scope) -> Result<&dyn VpcApi, ProviderError> {
        self.clients
            .as_ref()
            .map(|clients| clients.vpc.as_ref())
            .map_err(|message| scope.client_init(message.clone()))
    }

    /// Returns the tagging client.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ClientInit`] when the clients failed to
    /// initialise.
    pub fn tags(&self, scope: Scope) -> Result<&dyn TagApi, ProviderError> {
        self.clients
            .as_ref()
            .map(|clients| clients.tags.as_ref())
            .map_err(|message| scope.client_init(message.clone()))
    }

    /// Tags added to every tagged resource.
    #[must_use]
    pub fn env_tags(&self) -> &[String] {
        &self.env_tags
    }

    /// Wait budgets.
    #[must_use]
    pub const fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Delay between status polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Console base URL without a trailing slash.
    #[must_use]
    pub fn console_url(&self) -> &str {
        self.console_url.trim_end_matches('/')
    }

    /// Token that aborts in-flight status waits.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}
