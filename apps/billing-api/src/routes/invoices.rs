//! Invoice endpoints.
//!
//! Handlers only decode input and wrap output; every rule lives in
//! [`tavola_billing::InvoiceService`].

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::{ApiResponse, ApiResult};
use crate::state::AppState;
use tavola_billing::Settlement;
use tavola_core::validation::{parse_date, validate_required};
use tavola_core::{
    CreateInvoice, DailyRevenue, Invoice, InvoiceFilter, InvoicePatch, InvoiceStatistics,
    PaymentMethod, PaymentStatus, ValidationError,
};

type Envelope<T> = Json<ApiResponse<T>>;

// =============================================================================
// Request Types
// =============================================================================

/// `GET /invoices` query string. Blank values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,
    pub customer_id: Option<String>,
    pub staff_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    fn into_filter(self) -> Result<InvoiceFilter, ValidationError> {
        Ok(InvoiceFilter {
            payment_status: present(self.payment_status)
                .map(|s| s.parse::<PaymentStatus>())
                .transpose()?,
            payment_method: present(self.payment_method)
                .map(|m| m.parse::<PaymentMethod>())
                .transpose()?,
            customer_id: present(self.customer_id),
            staff_id: present(self.staff_id),
            start_date: present(self.start_date)
                .map(|d| parse_date("start_date", &d))
                .transpose()?,
            end_date: present(self.end_date)
                .map(|d| parse_date("end_date", &d))
                .transpose()?,
            search: present(self.search),
            limit: self.limit,
            offset: self.offset,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RevenueQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplyPromotionBody {
    #[serde(default)]
    pub promotion_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkPaidBody {
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub promotion_id: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn create_invoice(
    State(state): State<AppState>,
    payload: Result<Json<CreateInvoice>, JsonRejection>,
) -> ApiResult<(StatusCode, Envelope<Invoice>)> {
    let Json(data) = payload?;
    let invoice = state.invoices.create_invoice(data).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(invoice, "Invoice created")),
    ))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Envelope<Vec<Invoice>>> {
    let Query(query) = query?;
    let invoices = state.invoices.list_invoices(query.into_filter()?).await?;
    let message = format!("{} invoices", invoices.len());
    Ok(Json(ApiResponse::ok(invoices, message)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Invoice>> {
    let invoice = state.invoices.get_invoice(&id).await?;
    Ok(Json(ApiResponse::ok(invoice, "Invoice retrieved")))
}

pub async fn get_by_number(
    State(state): State<AppState>,
    Path(invoice_number): Path<String>,
) -> ApiResult<Envelope<Invoice>> {
    let invoice = state.invoices.get_invoice_by_number(&invoice_number).await?;
    Ok(Json(ApiResponse::ok(invoice, "Invoice retrieved")))
}

pub async fn get_by_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<Envelope<Invoice>> {
    let invoice = state.invoices.get_invoice_by_order(&order_id).await?;
    Ok(Json(ApiResponse::ok(invoice, "Invoice retrieved")))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<InvoicePatch>, JsonRejection>,
) -> ApiResult<Envelope<Invoice>> {
    let Json(patch) = payload?;
    let invoice = state.invoices.update_invoice(&id, patch).await?;
    Ok(Json(ApiResponse::ok(invoice, "Invoice updated")))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<()>> {
    state.invoices.delete_invoice(&id).await?;
    Ok(Json(ApiResponse::ok((), "Invoice deleted")))
}

pub async fn apply_promotion(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ApplyPromotionBody>, JsonRejection>,
) -> ApiResult<Envelope<Invoice>> {
    let Json(body) = payload?;
    let promotion_id = body.promotion_id.unwrap_or_default();
    validate_required("promotion_id", &promotion_id)?;

    let invoice = state
        .invoices
        .apply_promotion(&id, promotion_id.trim())
        .await?;
    Ok(Json(ApiResponse::ok(invoice, "Promotion applied")))
}

pub async fn mark_as_paid(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MarkPaidBody>, JsonRejection>,
) -> ApiResult<Envelope<Settlement>> {
    let Json(body) = payload?;
    let method = body.payment_method.unwrap_or_default();
    validate_required("payment_method", &method)?;
    let method: PaymentMethod = method.parse()?;

    let settlement = state
        .invoices
        .mark_as_paid(&id, method, body.promotion_id.as_deref())
        .await?;

    let message = if settlement.is_clean() {
        "Invoice paid".to_string()
    } else {
        format!(
            "Invoice paid; {} loyalty update(s) failed",
            settlement.soft_failures.len()
        )
    };
    Ok(Json(ApiResponse::ok(settlement, message)))
}

pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Invoice>> {
    let invoice = state.invoices.cancel_invoice(&id).await?;
    Ok(Json(ApiResponse::ok(invoice, "Invoice cancelled")))
}

pub async fn statistics(State(state): State<AppState>) -> ApiResult<Envelope<InvoiceStatistics>> {
    let stats = state.invoices.get_invoice_statistics().await?;
    Ok(Json(ApiResponse::ok(stats, "Invoice statistics")))
}

pub async fn revenue(
    State(state): State<AppState>,
    query: Result<Query<RevenueQuery>, QueryRejection>,
) -> ApiResult<Envelope<Vec<DailyRevenue>>> {
    let Query(query) = query?;
    let start = present(query.start_date)
        .map(|d| parse_date("start_date", &d))
        .transpose()?;
    let end = present(query.end_date)
        .map(|d| parse_date("end_date", &d))
        .transpose()?;

    let series = state.invoices.get_revenue_by_date_range(start, end).await?;
    Ok(Json(ApiResponse::ok(series, "Revenue by date")))
}
