use bytes::Bytes;
use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use http_body_util::Full;
use hyper::{body::Incoming, service::Service, Method, Request, Response, StatusCode, Uri};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde::Serialize;
use tracing::{error, info};
use url_escape::decode;

use std::{collections::HashMap, future::Future, pin::Pin, str::FromStr, sync::Arc};

use crate::{
    database::sqlite::{Connection, SqliteDatabase},
    error::StoreError,
    timing::{
        clock::{civil_now, evaluate_at},
        daily::{DailyHours, TimeOfDay},
        schedule::evaluate,
        weekday::Weekday,
    },
};

use super::myresponse::{Created, FacilityHours, FacilityStatus};

type HttpResult = Result<Response<Full<Bytes>>, hyper::Error>;

/// The Server
///
/// Handles the facility hours API. Reads and writes go through `SqliteDatabase`,
/// the open/closed answer comes from `WeeklyHours::evaluate`.
///
/// Cloned once per TCP connection; clones share the connection pool.
#[derive(Clone)]
pub struct Server {
    connection_pool: Arc<Pool<SqliteConnectionManager>>,
    timezone: Tz,
}

impl Server {
    pub fn setup(connection_pool: Arc<Pool<SqliteConnectionManager>>, timezone: Tz) -> Self {
        Self {
            connection_pool,
            timezone,
        }
    }

    /// Parses the query parameters and returns a `hashmap` of key pair values
    /// Returns `None` if the parameters are malformed
    fn parse_params(text: &str) -> Option<HashMap<String, String>> {
        let mut map: HashMap<String, String> = HashMap::new();
        for pairs in text.split('&').filter(|pair| !pair.is_empty()) {
            let mut iterator = pairs.split('=');
            map.insert(
                iterator.next()?.to_string(),
                decode(iterator.next()?).to_string(),
            );
        }
        Some(map)
    }

    fn params(uri: &Uri) -> Option<HashMap<String, String>> {
        Self::parse_params(uri.query().unwrap_or(""))
    }

    /// Obtain a connection from the connection pool.
    fn get_connection(&self) -> Result<Connection, StoreError> {
        Ok(self.connection_pool.get()?)
    }

    /// Resolves the `facility` parameter to an id and name.
    ///
    /// The `Err` side is the response to send back as-is.
    fn facility(
        connection: &Connection,
        map: &HashMap<String, String>,
    ) -> Result<(i64, String), HttpResult> {
        let Some(facility) = map.get("facility") else {
            return Err(Self::bad_request("facility not provided."));
        };
        let Ok(id) = facility.parse::<i64>() else {
            return Err(Self::bad_request("Malformed facility."));
        };
        match SqliteDatabase::query_facility_name(connection, id) {
            Ok(Some(name)) => Ok((id, name)),
            Ok(None) => Err(Self::not_found("Unknown facility.")),
            Err(err) => Err(Self::server_error(&err.to_string())),
        }
    }

    /// The GET /api/facilities endpoint.
    ///
    /// Every facility with its status right now.
    fn list_facilities(&self) -> HttpResult {
        let connection = match self.get_connection() {
            Ok(conn) => conn,
            Err(err) => return Self::server_error(&err.to_string()),
        };
        let facilities = match SqliteDatabase::list_facilities(&connection) {
            Ok(facilities) => facilities,
            Err(err) => return Self::server_error(&err.to_string()),
        };

        let now = civil_now(self.timezone);
        let mut result: Vec<FacilityStatus> = Vec::with_capacity(facilities.len());
        for (id, name) in facilities {
            let hours = match SqliteDatabase::query_weekly_hours(&connection, id) {
                Ok(hours) => hours,
                Err(err) => return Self::server_error(&err.to_string()),
            };
            result.push(FacilityStatus::new(id, name, evaluate(&hours, &now)));
        }
        Self::ok_data(result)
    }

    /// The GET /api/status endpoint.
    ///
    /// Takes a required `facility` id and an optional `at`, a civil datetime in the
    /// facility's zone. Without `at` the current time is used.
    fn status(&self, uri: &Uri) -> HttpResult {
        let connection = match self.get_connection() {
            Ok(conn) => conn,
            Err(err) => return Self::server_error(&err.to_string()),
        };

        let Some(map) = Self::params(uri) else {
            return Self::bad_request("Malformed Parameters.");
        };

        let (id, name) = match Self::facility(&connection, &map) {
            Ok(facility) => facility,
            Err(res) => return res,
        };

        let hours = match SqliteDatabase::query_weekly_hours(&connection, id) {
            Ok(hours) => hours,
            Err(err) => return Self::server_error(&err.to_string()),
        };

        let result = match map.get("at") {
            Some(at) => match NaiveDateTime::from_str(at) {
                Ok(at) => evaluate(&hours, &at),
                Err(_) => return Self::bad_request("Malformed Date"),
            },
            None => evaluate_at(&hours, Utc::now(), self.timezone),
        };
        Self::ok_data(FacilityStatus::new(id, name, result))
    }

    /// The GET /api/hours endpoint.
    fn get_hours(&self, uri: &Uri) -> HttpResult {
        let connection = match self.get_connection() {
            Ok(conn) => conn,
            Err(err) => return Self::server_error(&err.to_string()),
        };

        let Some(map) = Self::params(uri) else {
            return Self::bad_request("Malformed Parameters.");
        };

        let (id, name) = match Self::facility(&connection, &map) {
            Ok(facility) => facility,
            Err(res) => return res,
        };

        match SqliteDatabase::query_weekly_hours(&connection, id) {
            Ok(hours) => Self::ok_data(FacilityHours::new(id, name, &hours)),
            Err(err) => Self::server_error(&err.to_string()),
        }
    }

    /// The POST /api/facility endpoint. Creates a facility with every day closed.
    fn create_facility(&self, uri: &Uri) -> HttpResult {
        let connection = match self.get_connection() {
            Ok(conn) => conn,
            Err(err) => return Self::server_error(&err.to_string()),
        };

        let Some(map) = Self::params(uri) else {
            return Self::bad_request("Malformed Parameters.");
        };

        let Some(name) = map.get("name").map(|name| name.trim()) else {
            return Self::bad_request("name not provided.");
        };
        if name.is_empty() {
            return Self::bad_request("Malformed Name");
        }

        match SqliteDatabase::insert_facility(&connection, name) {
            Ok(id) => {
                info!(id, name, "Facility created");
                Self::ok_data(Created { id })
            }
            Err(err) => Self::server_error(&err.to_string()),
        }
    }

    /// The POST /api/hours endpoint.
    ///
    /// Sets one day of a facility's hours. Both `open` and `close` make an open
    /// day, neither makes it closed. Times are validated here so that a bad value
    /// never reaches the store.
    fn set_hours(&self, uri: &Uri) -> HttpResult {
        let connection = match self.get_connection() {
            Ok(conn) => conn,
            Err(err) => return Self::server_error(&err.to_string()),
        };

        let Some(map) = Self::params(uri) else {
            return Self::bad_request("Malformed Parameters.");
        };

        let (id, name) = match Self::facility(&connection, &map) {
            Ok(facility) => facility,
            Err(res) => return res,
        };

        let Some(day) = map.get("day") else {
            return Self::bad_request("day not provided.");
        };
        let day = match Weekday::from_str(day) {
            Ok(day) => day,
            Err(err) => return Self::bad_request(&err.to_string()),
        };

        let hours = match (map.get("open"), map.get("close")) {
            (None, None) => DailyHours::new_closed(),
            (Some(open), Some(close)) => {
                match (TimeOfDay::from_str(open), TimeOfDay::from_str(close)) {
                    (Ok(open), Ok(close)) => DailyHours::new_open(open, close),
                    (Err(err), _) | (_, Err(err)) => return Self::bad_request(&err.to_string()),
                }
            }
            _ => return Self::bad_request("open and close must be provided together."),
        };

        if let Err(err) = SqliteDatabase::upsert_daily_hours(&connection, id, day, hours) {
            return Self::server_error(&err.to_string());
        }
        info!(
            facility = id,
            day = day.abbrev(),
            overnight = hours.is_overnight(),
            ?hours,
            "Hours updated"
        );

        match SqliteDatabase::query_weekly_hours(&connection, id) {
            Ok(hours) => Self::ok_data(FacilityHours::new(id, name, &hours)),
            Err(err) => Self::server_error(&err.to_string()),
        }
    }

    /// Dispatches on method and path.
    fn route(&self, method: &Method, uri: &Uri) -> HttpResult {
        info!(%method, %uri, "Request");
        match method {
            &Method::GET => match uri.path() {
                "/api/facilities" => self.list_facilities(),
                "/api/status" => self.status(uri),
                "/api/hours" => self.get_hours(uri),
                _ => Server::not_found(""),
            },
            &Method::POST => match uri.path() {
                "/api/facility" => self.create_facility(uri),
                "/api/hours" => self.set_hours(uri),
                _ => Server::not_found(""),
            },
            _ => Server::not_found(""),
        }
    }

    fn error_body(message: &str) -> Bytes {
        Bytes::from(serde_json::json!({ "error": message }).to_string())
    }

    /// Return a 200 OK response with the data provided.
    fn ok_data<T: Serialize>(body: T) -> HttpResult {
        let data = match serde_json::to_string(&body) {
            Ok(data) => data,
            Err(err) => return Self::server_error(&err.to_string()),
        };
        Ok(Self::respond(StatusCode::OK, Bytes::from(data)))
    }

    /// Return a 500 Internal Server Error response with the message provided.
    fn server_error(message: &str) -> HttpResult {
        error!("{}", message);
        Ok(Self::respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            Self::error_body(message),
        ))
    }

    /// Return a 404 Not Found response with the message provided. The message here is optional.
    /// Leave it empty for no message.
    fn not_found(message: &str) -> HttpResult {
        let body = if message.is_empty() {
            Bytes::new()
        } else {
            Self::error_body(message)
        };
        Ok(Self::respond(StatusCode::NOT_FOUND, body))
    }

    /// Return a 400 Bad Request response with the message provided.
    fn bad_request(message: &str) -> HttpResult {
        Ok(Self::respond(StatusCode::BAD_REQUEST, Self::error_body(message)))
    }

    fn respond(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
        let mut res = Response::new(Full::new(body));
        *res.status_mut() = status;
        res.headers_mut().insert(
            hyper::header::CONTENT_TYPE,
            hyper::header::HeaderValue::from_static("application/json"),
        );
        res
    }
}

impl Service<Request<Incoming>> for Server {
    type Response = Response<Full<Bytes>>;
    type Error = hyper::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let res = self.route(req.method(), req.uri());
        Box::pin(async { res })
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::Value;

    use super::*;

    fn server() -> Server {
        let pool = Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())
            .unwrap();
        SqliteDatabase::create_tables(&pool.get().unwrap()).unwrap();
        Server::setup(Arc::new(pool), chrono_tz::Asia::Manila)
    }

    async fn call(server: &Server, method: Method, uri: &str) -> (StatusCode, Value) {
        let uri: Uri = uri.parse().unwrap();
        let res = server.route(&method, &uri).unwrap();
        let status = res.status();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    #[test]
    fn parses_query_strings() {
        let map = Server::parse_params("facility=1&name=Covered%20Court").unwrap();
        assert_eq!(map.get("facility").map(String::as_str), Some("1"));
        assert_eq!(map.get("name").map(String::as_str), Some("Covered Court"));
        assert!(Server::parse_params("facility").is_none());
        assert_eq!(Server::parse_params("").unwrap().len(), 0);
    }

    #[tokio::test]
    async fn friday_evening_hours_end_to_end() {
        let server = server();
        let (status, body) = call(&server, Method::POST, "/api/facility?name=Youth%20Hub").await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id"].as_i64().unwrap();

        let (status, _) = call(
            &server,
            Method::POST,
            &format!("/api/hours?facility={id}&day=Fri&open=18:00&close=23:00"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // 2024-06-07 is a Friday
        let (status, body) = call(
            &server,
            Method::GET,
            &format!("/api/status?facility={id}&at=2024-06-07T19:30:00"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_open"], Value::Bool(true));
        assert_eq!(body["label"], "Fri · 18:00–23:00");
        assert_eq!(body["name"], "Youth Hub");

        let (_, body) = call(
            &server,
            Method::GET,
            &format!("/api/status?facility={id}&at=2024-06-08T00:30:00"),
        )
        .await;
        assert_eq!(body["is_open"], Value::Bool(false));
        assert_eq!(body["label"], "Sat · Closed");
    }

    #[tokio::test]
    async fn hours_are_listed_sunday_first() {
        let server = server();
        let (_, body) = call(&server, Method::POST, "/api/facility?name=Gym").await;
        let id = body["id"].as_i64().unwrap();
        call(
            &server,
            Method::POST,
            &format!("/api/hours?facility={id}&day=monday&open=08:00&close=17:00"),
        )
        .await;

        let (status, body) = call(&server, Method::GET, &format!("/api/hours?facility={id}")).await;
        assert_eq!(status, StatusCode::OK);
        let days = body["days"].as_array().unwrap();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0]["day"], "Sun");
        assert_eq!(days[0]["status"], "closed");
        assert_eq!(days[1]["status"], "open");
        assert_eq!(days[1]["open"], "08:00");
        assert_eq!(days[1]["close"], "17:00");
    }

    #[tokio::test]
    async fn rejects_invalid_time_values() {
        let server = server();
        let (_, body) = call(&server, Method::POST, "/api/facility?name=Gym").await;
        let id = body["id"].as_i64().unwrap();

        let (status, body) = call(
            &server,
            Method::POST,
            &format!("/api/hours?facility={id}&day=Mon&open=24:00&close=17:00"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid time value"));

        let (status, _) = call(
            &server,
            Method::POST,
            &format!("/api/hours?facility={id}&day=Mon&open=09:00"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &server,
            Method::POST,
            &format!("/api/hours?facility={id}&day=Someday&open=09:00&close=10:00"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_things_are_not_found() {
        let server = server();
        let (status, _) = call(&server, Method::GET, "/api/status?facility=42").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&server, Method::GET, "/api/nothing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&server, Method::DELETE, "/api/hours").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&server, Method::GET, "/api/status").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(&server, Method::GET, "/api/status?facility=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn lists_every_facility() {
        let server = server();
        call(&server, Method::POST, "/api/facility?name=Hall").await;
        call(&server, Method::POST, "/api/facility?name=Court").await;
        let (status, body) = call(&server, Method::GET, "/api/facilities").await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["name"], "Hall");
        assert_eq!(list[1]["is_open"], Value::Bool(false));
        assert!(list[1]["label"].as_str().unwrap().ends_with("· Closed"));
    }
}
