#[macro_use]
extern crate rocket;

pub mod cache;
pub mod config;
pub mod db;
pub mod emails;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;
pub mod store;

use crate::config::CaseViewsConfig;
use crate::db::SqlxCaseDatabase;
use crate::emails::EmailsDao;
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::{Arc, Once};

static LOGGER: Once = Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let config = CaseViewsConfig::from_env();
    log::info!(
        "email cache: {} entries, {}s idle expiry",
        config.cache.max_entries,
        config.cache.time_to_idle.as_secs()
    );

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .to_cors();

    let mut rocket = rocket::build().attach(RequestLogger);
    match cors {
        Ok(cors) => rocket = rocket.attach(cors),
        Err(err) => log::error!("CORS disabled, invalid configuration: {}", err),
    }

    rocket
        // Open the case database and manage the DAO for this case
        .attach(AdHoc::try_on_ignite(
            "Case Database",
            move |rocket| async move {
                match SqlxCaseDatabase::connect(&config.database_url, config.max_connections).await
                {
                    Ok(db) => {
                        let dao = EmailsDao::new(Arc::new(db), &config.cache);
                        Ok(rocket.manage(dao))
                    }
                    Err(err) => {
                        log::error!(
                            "failed to open case database {}: {}",
                            config.database_url,
                            err
                        );
                        Err(rocket)
                    }
                }
            },
        ))
        // Closing the server closes the case
        .attach(AdHoc::on_shutdown("Clear Email Caches", |rocket| {
            Box::pin(async move {
                if let Some(dao) = rocket.state::<EmailsDao>() {
                    dao.invalidate_all();
                }
            })
        }))
        .mount(
            "/api/v1",
            openapi_get_routes![
                routes::health::health_check,
                routes::emails::get_email_messages,
                routes::emails::get_email_counts,
                routes::emails::post_change_event,
                routes::emails::clear_caches,
            ],
        )
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Case Views API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::{Build, Rocket, Route};
    use sqlx::any::AnyPoolOptions;
    use std::sync::Arc;

    use crate::config::CacheConfig;
    use crate::db::SqlxCaseDatabase;
    use crate::emails::EmailsDao;
    use crate::store::{ARTIFACT_TYPE_EMAIL_MSG, ATTRIBUTE_TYPE_PATH, ArtifactRef, CaseDatabase, Dialect};

    /// Attribute type id of the subject attribute in the test schema.
    pub const ATTRIBUTE_TYPE_SUBJECT: i32 = 22;

    const SCHEMA: &[&str] = &[
        "CREATE TABLE blackboard_artifacts (
            artifact_id INTEGER PRIMARY KEY,
            artifact_type_id INTEGER NOT NULL,
            data_source_obj_id INTEGER NOT NULL
        )",
        "CREATE TABLE blackboard_attribute_types (
            attribute_type_id INTEGER PRIMARY KEY,
            type_name TEXT NOT NULL,
            display_name TEXT
        )",
        "CREATE TABLE blackboard_attributes (
            artifact_id INTEGER NOT NULL,
            artifact_type_id INTEGER NOT NULL,
            attribute_type_id INTEGER NOT NULL,
            value_text TEXT
        )",
        "INSERT INTO blackboard_attribute_types (attribute_type_id, type_name, display_name)
         VALUES (8, 'TSK_PATH', 'Path'), (22, 'TSK_SUBJECT', 'Subject')",
    ];

    /// In-memory SQLite case database with the blackboard tables.
    ///
    /// The pool holds a single connection that never expires; every
    /// connection to `sqlite::memory:` is a separate database.
    pub struct TestCaseDatabase {
        db: SqlxCaseDatabase,
    }

    impl TestCaseDatabase {
        pub async fn new() -> Result<Self, sqlx::Error> {
            sqlx::any::install_default_drivers();
            let pool = AnyPoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?;

            for statement in SCHEMA {
                sqlx::query(statement).execute(&pool).await?;
            }

            Ok(Self {
                db: SqlxCaseDatabase::from_pool(pool, Dialect::Sqlite),
            })
        }

        pub fn database(&self) -> Arc<dyn CaseDatabase> {
            Arc::new(self.db.clone())
        }

        /// Fresh DAO over this database with default cache sizing.
        pub fn emails_dao(&self) -> EmailsDao {
            EmailsDao::new(self.database(), &CacheConfig::default())
        }

        /// Insert an email message artifact, with a path attribute if given.
        pub async fn insert_email(
            &self,
            artifact_id: i64,
            data_source_id: i64,
            path: Option<&str>,
        ) -> Result<ArtifactRef, sqlx::Error> {
            sqlx::query(
                "INSERT INTO blackboard_artifacts (artifact_id, artifact_type_id, data_source_obj_id) VALUES (?, ?, ?)",
            )
            .bind(artifact_id)
            .bind(i64::from(ARTIFACT_TYPE_EMAIL_MSG))
            .bind(data_source_id)
            .execute(self.db.pool())
            .await?;

            if let Some(path) = path {
                self.insert_attribute(artifact_id, ATTRIBUTE_TYPE_PATH, path).await?;
            }

            Ok(ArtifactRef {
                artifact_id,
                artifact_type_id: ARTIFACT_TYPE_EMAIL_MSG,
                data_source_id,
            })
        }

        pub async fn insert_attribute(
            &self,
            artifact_id: i64,
            attribute_type_id: i32,
            value: &str,
        ) -> Result<(), sqlx::Error> {
            sqlx::query(
                "INSERT INTO blackboard_attributes (artifact_id, artifact_type_id, attribute_type_id, value_text) VALUES (?, ?, ?, ?)",
            )
            .bind(artifact_id)
            .bind(i64::from(ARTIFACT_TYPE_EMAIL_MSG))
            .bind(i64::from(attribute_type_id))
            .bind(value.to_string())
            .execute(self.db.pool())
            .await?;
            Ok(())
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        emails_dao: Option<EmailsDao>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                emails_dao: None,
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        pub fn manage_emails_dao(mut self, dao: EmailsDao) -> Self {
            self.emails_dao = Some(dao);
            self
        }

        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(dao) = self.emails_dao {
                rocket = rocket.manage(dao);
            }

            rocket
        }

        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
