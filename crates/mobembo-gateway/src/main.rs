use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, header, request::Parts},
    routing::{get, post},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{error, info};
use uuid::Uuid;

use mobembo_booking::{
    ReservationEngine, ReservationRequest, SettlementEngine, SettlementRequest, SimulatedProvider,
};
use mobembo_core::{BookingError, PaymentMethod, PaymentStatus, ScheduleStatus};
use mobembo_platform::{
    BookingCreatedEvent, BookingDetailResponse, BookingPaymentView, BookingResponse,
    BookingScheduleView, BusResponse, CHANNEL_BOOKINGS_CREATED, CHANNEL_PAYMENTS_SUCCEEDED,
    CompanyResponse, CreateBookingRequest, CreateBusRequest, CreateCompanyRequest,
    CreatePaymentRequest, CreateRouteRequest, CreateScheduleRequest, PaymentResponse,
    PaymentSucceededEvent, RedisBus, RouteResponse, ScheduleBusView, ScheduleResponse,
    ScheduleRouteView, ServiceConfig, connect_database,
};
use mobembo_store::{PgCoordinator, run_migrations};

const ROLE_ADMIN: &str = "ADMIN";
const MIN_PHONE_DIGITS: usize = 9;

#[derive(Clone)]
struct AppState {
    pool: PgPool,
    redis: RedisBus,
    auth: AuthVerifier,
    reservations: ReservationEngine,
    settlements: SettlementEngine,
}

#[derive(Clone)]
struct AuthVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl AuthVerifier {
    fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

/// Session claims minted by the external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: String,
    exp: usize,
}

#[derive(Debug, Clone)]
struct AuthenticatedUser {
    id: Uuid,
    role: String,
}

impl AuthenticatedUser {
    fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    "missing bearer token".to_string(),
                )
            })?;

        let data = decode::<Claims>(token, &state.auth.key, &state.auth.validation)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid session token".to_string()))?;

        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid session token".to_string()))?;

        Ok(AuthenticatedUser {
            id,
            role: data.claims.role,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ListBusesQuery {
    company_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct ListRoutesQuery {
    company_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct ListSchedulesQuery {
    route_id: Option<Uuid>,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "mobembo_gateway=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let pool = connect_database(&config.database_url).await?;
    run_migrations(&pool).await?;
    let redis = RedisBus::connect(&config.redis_url)?;

    let coordinator = Arc::new(PgCoordinator::new(pool.clone()));
    let reservations = ReservationEngine::new(coordinator.clone());
    let settlements = SettlementEngine::new(coordinator, Arc::new(SimulatedProvider));
    let auth = AuthVerifier::new(&config.auth_secret);

    let state = AppState {
        pool,
        redis,
        auth,
        reservations,
        settlements,
    };
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/companies", get(list_companies).post(create_company))
        .route("/buses", get(list_buses).post(create_bus))
        .route("/routes", get(list_routes).post(create_route))
        .route("/schedules", get(list_schedules).post(create_schedule))
        .route("/schedules/{schedule_id}", get(get_schedule))
        .route("/bookings", post(create_booking))
        .route("/bookings/{booking_id}", get(get_booking))
        .route("/payments", post(create_payment))
        .with_state(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn create_company(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<CompanyResponse>), (StatusCode, String)> {
    require_admin(&user)?;

    let name = payload.name.trim().to_string();
    if name.len() < 2 {
        return Err((StatusCode::BAD_REQUEST, "name is required".to_string()));
    }
    let phone = payload.phone.trim().to_string();
    if phone.len() < MIN_PHONE_DIGITS {
        return Err((StatusCode::BAD_REQUEST, "phone number is invalid".to_string()));
    }
    let email = payload.email.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err((StatusCode::BAD_REQUEST, "email is invalid".to_string()));
    }

    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO transport_companies (id, name, phone, email, address, description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(&name)
    .bind(&phone)
    .bind(&email)
    .bind(&payload.address)
    .bind(&payload.description)
    .bind(now)
    .execute(&state.pool)
    .await
    .map_err(|err| match err.as_database_error() {
        Some(db) if db.is_unique_violation() => (
            StatusCode::CONFLICT,
            "a company with this email already exists".to_string(),
        ),
        _ => internal_error(err),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(CompanyResponse {
            id,
            name,
            phone,
            email,
            address: payload.address,
            description: payload.description,
            bus_count: 0,
            route_count: 0,
            created_at: now,
        }),
    ))
}

async fn list_companies(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompanyResponse>>, (StatusCode, String)> {
    let rows = sqlx::query(
        r#"
        SELECT
            c.id, c.name, c.phone, c.email, c.address, c.description, c.created_at,
            (SELECT COUNT(*) FROM buses b WHERE b.company_id = c.id) AS bus_count,
            (SELECT COUNT(*) FROM routes r WHERE r.company_id = c.id) AS route_count
        FROM transport_companies c
        ORDER BY c.name ASC
        "#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(CompanyResponse {
            id: row.try_get("id").map_err(internal_error)?,
            name: row.try_get("name").map_err(internal_error)?,
            phone: row.try_get("phone").map_err(internal_error)?,
            email: row.try_get("email").map_err(internal_error)?,
            address: row.try_get("address").map_err(internal_error)?,
            description: row.try_get("description").map_err(internal_error)?,
            bus_count: row.try_get("bus_count").map_err(internal_error)?,
            route_count: row.try_get("route_count").map_err(internal_error)?,
            created_at: row.try_get("created_at").map_err(internal_error)?,
        });
    }

    Ok(Json(items))
}

async fn create_bus(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateBusRequest>,
) -> Result<(StatusCode, Json<BusResponse>), (StatusCode, String)> {
    require_admin(&user)?;

    let plate_number = payload.plate_number.trim().to_string();
    if plate_number.len() < 3 {
        return Err((StatusCode::BAD_REQUEST, "plate number is invalid".to_string()));
    }
    if payload.total_seats < 1 {
        return Err((
            StatusCode::BAD_REQUEST,
            "total seats must be at least 1".to_string(),
        ));
    }

    let company = sqlx::query("SELECT name FROM transport_companies WHERE id = $1")
        .bind(payload.company_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;
    let Some(company) = company else {
        return Err((StatusCode::NOT_FOUND, "company not found".to_string()));
    };
    let company_name: String = company.try_get("name").map_err(internal_error)?;

    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO buses (id, plate_number, model, total_seats, company_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(&plate_number)
    .bind(&payload.model)
    .bind(payload.total_seats)
    .bind(payload.company_id)
    .bind(now)
    .execute(&state.pool)
    .await
    .map_err(|err| match err.as_database_error() {
        Some(db) if db.is_unique_violation() => (
            StatusCode::CONFLICT,
            "a bus with this plate number already exists".to_string(),
        ),
        _ => internal_error(err),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(BusResponse {
            id,
            plate_number,
            model: payload.model,
            total_seats: payload.total_seats,
            company_id: payload.company_id,
            company_name,
            created_at: now,
        }),
    ))
}

async fn list_buses(
    State(state): State<AppState>,
    Query(query): Query<ListBusesQuery>,
) -> Result<Json<Vec<BusResponse>>, (StatusCode, String)> {
    let rows = sqlx::query(
        r#"
        SELECT
            b.id, b.plate_number, b.model, b.total_seats, b.company_id, b.created_at,
            c.name AS company_name
        FROM buses b
        INNER JOIN transport_companies c ON c.id = b.company_id
        WHERE ($1::uuid IS NULL OR b.company_id = $1)
        ORDER BY b.created_at DESC
        "#,
    )
    .bind(query.company_id)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(BusResponse {
            id: row.try_get("id").map_err(internal_error)?,
            plate_number: row.try_get("plate_number").map_err(internal_error)?,
            model: row.try_get("model").map_err(internal_error)?,
            total_seats: row.try_get("total_seats").map_err(internal_error)?,
            company_id: row.try_get("company_id").map_err(internal_error)?,
            company_name: row.try_get("company_name").map_err(internal_error)?,
            created_at: row.try_get("created_at").map_err(internal_error)?,
        });
    }

    Ok(Json(items))
}

async fn create_route(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<RouteResponse>), (StatusCode, String)> {
    require_admin(&user)?;

    let departure = payload.departure.trim().to_string();
    let destination = payload.destination.trim().to_string();
    if departure.len() < 2 || destination.len() < 2 {
        return Err((
            StatusCode::BAD_REQUEST,
            "departure and destination are required".to_string(),
        ));
    }
    if payload.price <= Decimal::ZERO {
        return Err((StatusCode::BAD_REQUEST, "price must be positive".to_string()));
    }

    let company = sqlx::query("SELECT name FROM transport_companies WHERE id = $1")
        .bind(payload.company_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;
    let Some(company) = company else {
        return Err((StatusCode::NOT_FOUND, "company not found".to_string()));
    };
    let company_name: String = company.try_get("name").map_err(internal_error)?;

    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO routes (
            id, departure, destination, price, duration_minutes, company_id, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(&departure)
    .bind(&destination)
    .bind(payload.price)
    .bind(payload.duration_minutes)
    .bind(payload.company_id)
    .bind(now)
    .execute(&state.pool)
    .await
    .map_err(|err| match err.as_database_error() {
        Some(db) if db.is_unique_violation() => (
            StatusCode::CONFLICT,
            "this company already serves this route".to_string(),
        ),
        _ => internal_error(err),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(RouteResponse {
            id,
            departure,
            destination,
            price: payload.price,
            duration_minutes: payload.duration_minutes,
            company_id: payload.company_id,
            company_name,
            created_at: now,
        }),
    ))
}

async fn list_routes(
    State(state): State<AppState>,
    Query(query): Query<ListRoutesQuery>,
) -> Result<Json<Vec<RouteResponse>>, (StatusCode, String)> {
    let rows = sqlx::query(
        r#"
        SELECT
            r.id, r.departure, r.destination, r.price, r.duration_minutes,
            r.company_id, r.created_at,
            c.name AS company_name
        FROM routes r
        INNER JOIN transport_companies c ON c.id = r.company_id
        WHERE ($1::uuid IS NULL OR r.company_id = $1)
        ORDER BY r.departure ASC
        "#,
    )
    .bind(query.company_id)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(RouteResponse {
            id: row.try_get("id").map_err(internal_error)?,
            departure: row.try_get("departure").map_err(internal_error)?,
            destination: row.try_get("destination").map_err(internal_error)?,
            price: row.try_get("price").map_err(internal_error)?,
            duration_minutes: row.try_get("duration_minutes").map_err(internal_error)?,
            company_id: row.try_get("company_id").map_err(internal_error)?,
            company_name: row.try_get("company_name").map_err(internal_error)?,
            created_at: row.try_get("created_at").map_err(internal_error)?,
        });
    }

    Ok(Json(items))
}

async fn create_schedule(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleResponse>), (StatusCode, String)> {
    require_admin(&user)?;

    let bus = sqlx::query("SELECT total_seats FROM buses WHERE id = $1")
        .bind(payload.bus_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;
    let Some(bus) = bus else {
        return Err((StatusCode::NOT_FOUND, "bus not found".to_string()));
    };
    let total_seats: i32 = bus.try_get("total_seats").map_err(internal_error)?;

    let route = sqlx::query("SELECT id FROM routes WHERE id = $1")
        .bind(payload.route_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;
    if route.is_none() {
        return Err((StatusCode::NOT_FOUND, "route not found".to_string()));
    }

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO schedules (
            id, route_id, bus_id, departure_time, arrival_time,
            available_seats, status, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(payload.route_id)
    .bind(payload.bus_id)
    .bind(payload.departure_time)
    .bind(payload.arrival_time)
    .bind(total_seats)
    .bind(ScheduleStatus::Active.as_str())
    .bind(Utc::now())
    .execute(&state.pool)
    .await
    .map_err(internal_error)?;

    let view = fetch_schedule_view(&state.pool, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| internal_error("schedule vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(view)))
}

async fn list_schedules(
    State(state): State<AppState>,
    Query(query): Query<ListSchedulesQuery>,
) -> Result<Json<Vec<ScheduleResponse>>, (StatusCode, String)> {
    let rows = sqlx::query(
        r#"
        SELECT
            s.id, s.departure_time, s.arrival_time, s.available_seats, s.status,
            r.id AS route_id, r.departure, r.destination, r.price,
            c.name AS company_name,
            b.plate_number, b.model, b.total_seats
        FROM schedules s
        INNER JOIN routes r ON r.id = s.route_id
        INNER JOIN transport_companies c ON c.id = r.company_id
        INNER JOIN buses b ON b.id = s.bus_id
        WHERE ($1::uuid IS NULL OR s.route_id = $1)
        ORDER BY s.departure_time ASC
        "#,
    )
    .bind(query.route_id)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(schedule_view_from_row(&row).map_err(internal_error)?);
    }

    Ok(Json(items))
}

async fn get_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<ScheduleResponse>, (StatusCode, String)> {
    let view = fetch_schedule_view(&state.pool, schedule_id)
        .await
        .map_err(internal_error)?;

    match view {
        Some(view) => Ok(Json(view)),
        None => Err((StatusCode::NOT_FOUND, "schedule not found".to_string())),
    }
}

async fn create_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), (StatusCode, String)> {
    let booking = state
        .reservations
        .create_booking(ReservationRequest {
            user_id: user.id,
            schedule_id: payload.schedule_id,
            seats_booked: payload.seats_booked,
        })
        .await
        .map_err(booking_error_response)?;

    let event = BookingCreatedEvent {
        booking_id: booking.id,
        user_id: booking.user_id,
        schedule_id: booking.schedule_id,
        seats_booked: booking.seats_booked,
        total_price: booking.total_price,
    };
    if let Err(err) = state.redis.publish_json(CHANNEL_BOOKINGS_CREATED, &event).await {
        error!("failed to publish booking event: {err}");
    }

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            id: booking.id,
            schedule_id: booking.schedule_id,
            seats_booked: booking.seats_booked,
            total_price: booking.total_price,
            status: booking.status.as_str().to_string(),
            created_at: booking.created_at,
        }),
    ))
}

async fn get_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingDetailResponse>, (StatusCode, String)> {
    let row = sqlx::query(
        r#"
        SELECT
            bk.id, bk.user_id, bk.seats_booked, bk.total_price, bk.status, bk.created_at,
            s.id AS schedule_id, s.departure_time, s.arrival_time,
            r.departure, r.destination,
            c.name AS company_name,
            b.plate_number, b.model,
            p.id AS payment_id, p.amount, p.method, p.transaction_ref,
            p.status AS payment_status, p.paid_at
        FROM bookings bk
        INNER JOIN schedules s ON s.id = bk.schedule_id
        INNER JOIN routes r ON r.id = s.route_id
        INNER JOIN transport_companies c ON c.id = r.company_id
        INNER JOIN buses b ON b.id = s.bus_id
        LEFT JOIN payments p ON p.booking_id = bk.id
        WHERE bk.id = $1
        "#,
    )
    .bind(booking_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?;

    let Some(row) = row else {
        return Err((StatusCode::NOT_FOUND, "booking not found".to_string()));
    };

    let owner_id: Uuid = row.try_get("user_id").map_err(internal_error)?;
    if owner_id != user.id && !user.is_admin() {
        return Err((StatusCode::FORBIDDEN, "access denied".to_string()));
    }

    let payment_id: Option<Uuid> = row.try_get("payment_id").map_err(internal_error)?;
    let payment = match payment_id {
        Some(id) => Some(BookingPaymentView {
            id,
            amount: row.try_get("amount").map_err(internal_error)?,
            method: row.try_get("method").map_err(internal_error)?,
            transaction_ref: row.try_get("transaction_ref").map_err(internal_error)?,
            status: row.try_get("payment_status").map_err(internal_error)?,
            paid_at: row.try_get("paid_at").map_err(internal_error)?,
        }),
        None => None,
    };

    Ok(Json(BookingDetailResponse {
        id: row.try_get("id").map_err(internal_error)?,
        seats_booked: row.try_get("seats_booked").map_err(internal_error)?,
        total_price: row.try_get("total_price").map_err(internal_error)?,
        status: row.try_get("status").map_err(internal_error)?,
        created_at: row.try_get("created_at").map_err(internal_error)?,
        schedule: BookingScheduleView {
            id: row.try_get("schedule_id").map_err(internal_error)?,
            departure_time: row.try_get("departure_time").map_err(internal_error)?,
            arrival_time: row.try_get("arrival_time").map_err(internal_error)?,
            departure: row.try_get("departure").map_err(internal_error)?,
            destination: row.try_get("destination").map_err(internal_error)?,
            company_name: row.try_get("company_name").map_err(internal_error)?,
            bus_plate_number: row.try_get("plate_number").map_err(internal_error)?,
            bus_model: row.try_get("model").map_err(internal_error)?,
        },
        payment,
    }))
}

async fn create_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), (StatusCode, String)> {
    let method = PaymentMethod::parse_str(payload.method.trim()).map_err(invalid_request)?;

    let phone_number = payload.phone_number.trim().to_string();
    if phone_number.len() < MIN_PHONE_DIGITS {
        return Err((StatusCode::BAD_REQUEST, "phone number is invalid".to_string()));
    }

    let payment = state
        .settlements
        .settle(SettlementRequest {
            user_id: user.id,
            booking_id: payload.booking_id,
            method,
            phone_number,
        })
        .await
        .map_err(booking_error_response)?;

    if let (PaymentStatus::Success, Some(paid_at)) = (payment.status, payment.paid_at) {
        let event = PaymentSucceededEvent {
            payment_id: payment.id,
            booking_id: payment.booking_id,
            transaction_ref: payment.transaction_ref.clone(),
            amount: payment.amount,
            paid_at,
        };
        if let Err(err) = state
            .redis
            .publish_json(CHANNEL_PAYMENTS_SUCCEEDED, &event)
            .await
        {
            error!("failed to publish payment event: {err}");
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            id: payment.id,
            booking_id: payment.booking_id,
            amount: payment.amount,
            method: payment.method.as_str().to_string(),
            phone_number: payment.phone_number,
            transaction_ref: payment.transaction_ref,
            status: payment.status.as_str().to_string(),
            paid_at: payment.paid_at,
            created_at: payment.created_at,
        }),
    ))
}

async fn fetch_schedule_view(
    pool: &PgPool,
    schedule_id: Uuid,
) -> Result<Option<ScheduleResponse>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT
            s.id, s.departure_time, s.arrival_time, s.available_seats, s.status,
            r.id AS route_id, r.departure, r.destination, r.price,
            c.name AS company_name,
            b.plate_number, b.model, b.total_seats
        FROM schedules s
        INNER JOIN routes r ON r.id = s.route_id
        INNER JOIN transport_companies c ON c.id = r.company_id
        INNER JOIN buses b ON b.id = s.bus_id
        WHERE s.id = $1
        "#,
    )
    .bind(schedule_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| schedule_view_from_row(&row)).transpose()
}

fn schedule_view_from_row(row: &sqlx::postgres::PgRow) -> Result<ScheduleResponse, sqlx::Error> {
    Ok(ScheduleResponse {
        id: row.try_get("id")?,
        route: ScheduleRouteView {
            id: row.try_get("route_id")?,
            departure: row.try_get("departure")?,
            destination: row.try_get("destination")?,
            price: row.try_get("price")?,
            company_name: row.try_get("company_name")?,
        },
        bus: ScheduleBusView {
            plate_number: row.try_get("plate_number")?,
            model: row.try_get("model")?,
            total_seats: row.try_get("total_seats")?,
        },
        departure_time: row.try_get("departure_time")?,
        arrival_time: row.try_get("arrival_time")?,
        available_seats: row.try_get("available_seats")?,
        status: row.try_get("status")?,
    })
}

fn require_admin(user: &AuthenticatedUser) -> Result<(), (StatusCode, String)> {
    if user.is_admin() {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            "administrator role required".to_string(),
        ))
    }
}

fn booking_error_response(err: BookingError) -> (StatusCode, String) {
    match &err {
        BookingError::ScheduleNotFound | BookingError::BookingNotFound => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        BookingError::ScheduleUnavailable
        | BookingError::InsufficientSeats { .. }
        | BookingError::InvalidSeatCount
        | BookingError::PaymentAlreadyExists => (StatusCode::BAD_REQUEST, err.to_string()),
        BookingError::Unauthenticated => (StatusCode::UNAUTHORIZED, err.to_string()),
        BookingError::Forbidden => (StatusCode::FORBIDDEN, err.to_string()),
        BookingError::PaymentDeclined { .. } => (StatusCode::BAD_GATEWAY, err.to_string()),
        BookingError::Store(source) => {
            error!("storage failure: {source:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
        }
    }
}

fn invalid_request(err: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    error!("request failed: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
}
