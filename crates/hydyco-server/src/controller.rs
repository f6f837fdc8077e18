//! Lifecycle controller — collects handlers, then starts the server once.

use hydyco_protocol::{ADMIN_PREFIX, ADMIN_UI_PATH, LifecycleError, PreconditionError, Registration, ServerConfig};
use hydyco_store::MappingStore;
use hydyco_transport::{BoxHandler, HttpServer, ListenConfig, Mount, Pipeline};
use tracing::{debug, info};

use crate::builtin::{admin_ui, welcome};
use crate::error::StartError;
use crate::middleware::{JsonBodyParser, SharedSecretAuth, cors, request_logger};
use crate::plugins::{FilePlugin, docs_plugin};

/// Owns everything registered with the server and enforces that it is all
/// registered before the server starts.
///
/// Registration order matters; [`LifecycleController::compose`] documents
/// the order handlers see requests in.
pub struct LifecycleController {
    config: ServerConfig,
    started: bool,
    /// Body parsing and logging, ahead of everything else
    preamble: Vec<BoxHandler>,
    database: Option<BoxHandler>,
    plugins: Vec<BoxHandler>,
    middleware: Vec<BoxHandler>,
    routes: Vec<BoxHandler>,
}

impl LifecycleController {
    /// Controller whose file plugin opens the mapping store from the
    /// install location on first use.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_file_plugin(config, FilePlugin::lazy())
    }

    /// Controller whose file plugin uses `store`.
    pub fn with_store(config: ServerConfig, store: MappingStore) -> Self {
        Self::with_file_plugin(config, FilePlugin::new(store))
    }

    fn with_file_plugin(config: ServerConfig, file_plugin: FilePlugin) -> Self {
        let mut preamble = vec![BoxHandler::new(JsonBodyParser::new())];
        if config.logger {
            preamble.push(request_logger());
        }

        let plugins = vec![file_plugin.into_handler(), docs_plugin()];
        let middleware = vec![
            cors(&config.cors),
            BoxHandler::new(SharedSecretAuth::new(config.auth.secret_or_key.clone())),
        ];

        Self {
            config,
            started: false,
            preamble,
            database: None,
            plugins,
            middleware,
            routes: Vec::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_database_bound(&self) -> bool {
        self.database.is_some()
    }

    /// Bind the database handler, replacing any earlier one.
    pub fn register_database(&mut self, database: BoxHandler) -> Result<(), LifecycleError> {
        self.ensure_not_started(Registration::Database)?;
        debug!("Registering database: {}", database.name());
        self.database = Some(database);
        Ok(())
    }

    /// Append plugins after the built-ins and earlier registrations.
    pub fn register_plugins(
        &mut self,
        plugins: impl IntoIterator<Item = BoxHandler>,
    ) -> Result<(), LifecycleError> {
        self.ensure_not_started(Registration::Plugins)?;
        for plugin in plugins {
            debug!("Registering plugin: {}", plugin.name());
            self.plugins.push(plugin);
        }
        Ok(())
    }

    /// Append middleware after the built-ins and earlier registrations.
    pub fn register_middleware(
        &mut self,
        middleware: impl IntoIterator<Item = BoxHandler>,
    ) -> Result<(), LifecycleError> {
        self.ensure_not_started(Registration::Middleware)?;
        for handler in middleware {
            debug!("Registering middleware: {}", handler.name());
            self.middleware.push(handler);
        }
        Ok(())
    }

    /// Replace the route list. Unlike plugins and middleware, routes from
    /// earlier calls are dropped.
    pub fn register_routes(
        &mut self,
        routes: impl IntoIterator<Item = BoxHandler>,
    ) -> Result<(), LifecycleError> {
        self.ensure_not_started(Registration::Routes)?;
        self.routes = routes.into_iter().collect();
        debug!("Registered {} routes", self.routes.len());
        Ok(())
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(BoxHandler::name).collect()
    }

    pub fn middleware_names(&self) -> Vec<&str> {
        self.middleware.iter().map(BoxHandler::name).collect()
    }

    pub fn route_names(&self) -> Vec<&str> {
        self.routes.iter().map(BoxHandler::name).collect()
    }

    /// Build the request pipeline. Handlers see requests in this order:
    ///
    /// 1. JSON body parsing, then request logging if enabled
    /// 2. the database handler, under the admin prefix
    /// 3. the admin UI
    /// 4. plugins, under the admin prefix
    /// 5. middleware
    /// 6. routes
    /// 7. the welcome page
    pub fn compose(&self) -> Result<Pipeline, PreconditionError> {
        let database = self
            .database
            .clone()
            .ok_or(PreconditionError::DatabaseNotRegistered)?;

        let admin = Mount::prefix(ADMIN_PREFIX);
        let mut builder = Pipeline::builder();

        for handler in &self.preamble {
            builder.push_global(handler.clone());
        }
        builder.push(admin.clone(), database);
        builder.push_global(admin_ui());
        for plugin in &self.plugins {
            builder.push(admin.clone(), plugin.clone());
        }
        for handler in &self.middleware {
            builder.push_global(handler.clone());
        }
        for route in &self.routes {
            builder.push_global(route.clone());
        }
        builder.push_global(welcome());

        Ok(builder.build())
    }

    /// Compose the pipeline and start listening on the configured port.
    ///
    /// Fails without binding anything if no database is registered or the
    /// server was already started.
    pub async fn start(&mut self) -> Result<HttpServer, StartError> {
        if self.started {
            return Err(LifecycleError::AlreadyStarted.into());
        }
        let pipeline = self.compose()?;
        debug!("Pipeline: {} stages", pipeline.describe().len());

        let server = HttpServer::start(&ListenConfig::new(self.config.port), pipeline).await?;
        self.started = true;

        let port = server.port();
        info!("Hydyco server started on port {port}");
        println!("{}", banner(&format!("Server started at http://localhost:{port}")));
        println!("{}", banner(&format!("Admin ui at http://localhost:{port}{ADMIN_UI_PATH}")));

        Ok(server)
    }

    fn ensure_not_started(&self, what: Registration) -> Result<(), LifecycleError> {
        if self.started {
            return Err(LifecycleError::RegisterAfterStart(what));
        }
        Ok(())
    }
}

/// Text in a double-line box with one line of padding and margin.
fn banner(text: &str) -> String {
    let inner = text.chars().count() + 6;
    let rule = "═".repeat(inner);
    let blank = " ".repeat(inner);
    format!("\n╔{rule}╗\n║{blank}║\n║   {text}   ║\n║{blank}║\n╚{rule}╝\n")
}
