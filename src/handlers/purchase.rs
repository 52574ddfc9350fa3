use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use futures_util::TryStreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::assembly::{self, FormFields};
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::purchase_order::{BillAttachment, PurchaseOrder};
use crate::uploads::{BillStore, BILL_FIELD};
use crate::{numbering, repo};

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseResponse {
    pub success: bool,
    pub message: String,
    pub order_number: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderResponse {
    pub id: Uuid,
    pub buyer_name: String,
    pub email: String,
    /// RFC 3339, or null when the submitted date never parsed.
    pub purchase_date: Option<String>,
    pub platform: String,
    pub gst: String,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    #[schema(value_type = Object)]
    pub products: Value,
    /// Decimal as a string, e.g. "129.99".
    pub grand_total: String,
    pub order_number: String,
    #[schema(value_type = Option<Object>)]
    pub bill_upload: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PurchaseOrder> for PurchaseOrderResponse {
    fn from(o: PurchaseOrder) -> Self {
        Self {
            id: o.id,
            buyer_name: o.buyer_name,
            email: o.email,
            purchase_date: o.purchase_date.map(|d| d.to_rfc3339()),
            platform: o.platform,
            gst: o.gst,
            invoice_number: o.invoice_number,
            notes: o.notes,
            products: o.products,
            grand_total: o.grand_total.to_string(),
            order_number: o.order_number,
            bill_upload: o.bill_upload,
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListPurchasesResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<PurchaseOrderResponse>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up"),
    ),
    tag = "health"
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "message": "Purchase order service is running",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// Drain the multipart body: the `billUpload` file part goes to the blob
/// store (its write completes here, before assembly runs), every other part
/// is collected as a text field.
async fn collect_submission(
    payload: &mut Multipart,
    store: &BillStore,
) -> Result<(FormFields, Option<BillAttachment>), AppError> {
    let mut fields = FormFields::default();
    let mut bill = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    {
        let (name, filename) = {
            let disposition = field.content_disposition();
            (
                disposition.get_name().unwrap_or_default().to_string(),
                disposition.get_filename().map(str::to_string),
            )
        };

        match filename {
            Some(original) if name == BILL_FIELD => {
                let mimetype = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                bill = Some(store.receive(&mut field, &original, &mimetype).await?);
            }
            _ => {
                let mut raw = Vec::new();
                while let Some(chunk) = field
                    .try_next()
                    .await
                    .map_err(|e| AppError::Internal(e.to_string()))?
                {
                    raw.extend_from_slice(&chunk);
                }
                fields.insert(name, String::from_utf8_lossy(&raw).into_owned());
            }
        }
    }

    Ok((fields, bill))
}

/// POST /api/purchase
///
/// Multipart submission: flat text fields plus an optional `billUpload` file
/// part. The upload is stored first, then the fields are assembled into a
/// validated aggregate, numbered, and inserted. The numbering count and the
/// insert are separate statements (see `numbering`), which is the only
/// concurrency hazard in the system.
#[utoipa::path(
    post,
    path = "/api/purchase",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Purchase order created", body = CreatePurchaseResponse),
        (status = 400, description = "Missing required fields or no qualifying product line"),
        (status = 500, description = "Upload rejected or persistence failure"),
    ),
    tag = "purchase"
)]
pub async fn create_purchase(
    pool: web::Data<DbPool>,
    store: web::Data<BillStore>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let (fields, bill) = collect_submission(&mut payload, &store).await?;
    let draft = assembly::assemble(&fields, bill)?;

    let order_number = web::block(move || {
        let mut conn = pool.get()?;
        let count = repo::count_all(&mut conn)?;
        let number = numbering::order_number(Utc::now().timestamp_millis(), count);
        let row = draft.into_row(number)?;
        let saved = repo::insert(&mut conn, &row)?;
        Ok::<_, AppError>(saved.order_number)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    log::info!("Created purchase order {}", order_number);

    Ok(HttpResponse::Created().json(CreatePurchaseResponse {
        success: true,
        message: "Purchase order created successfully".to_string(),
        order_number,
    }))
}

/// GET /api/purchase
///
/// Returns every purchase order, newest first, with the embedded product
/// lines and attachment metadata.
#[utoipa::path(
    get,
    path = "/api/purchase",
    responses(
        (status = 200, description = "All purchase orders, newest first", body = ListPurchasesResponse),
        (status = 500, description = "Persistence failure"),
    ),
    tag = "purchase"
)]
pub async fn list_purchases(pool: web::Data<DbPool>) -> Result<HttpResponse, AppError> {
    let rows = web::block(move || {
        let mut conn = pool.get()?;
        repo::find_all_created_desc(&mut conn)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let data: Vec<PurchaseOrderResponse> =
        rows.into_iter().map(PurchaseOrderResponse::from).collect();

    Ok(HttpResponse::Ok().json(ListPurchasesResponse {
        success: true,
        count: data.len(),
        data,
    }))
}
