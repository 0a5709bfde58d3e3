use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::admin::{dtos as admin_dtos, handlers as admin_handlers};
use crate::features::appointments::{
    dtos as appointments_dtos, handlers as appointments_handlers, models as appointments_models,
};
use crate::features::auth;
use crate::features::documents::{
    dtos as documents_dtos, handlers as documents_handlers, models as documents_models,
};
use crate::features::faqs::{dtos as faqs_dtos, handlers as faqs_handlers};
use crate::features::payments::{
    dtos as payments_dtos, handlers as payments_handlers, models as payments_models,
};
use crate::features::service_requests::{
    dtos as service_requests_dtos, handlers as service_requests_handlers,
    models as service_requests_models,
};
use crate::features::service_types::{
    dtos as service_types_dtos, handlers as service_types_handlers,
    models as service_types_models,
};
use crate::shared::types::{ErrorResponse, PaginationMeta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handlers::me,
        // Service types
        service_types_handlers::list_service_types,
        service_types_handlers::get_service_type,
        service_types_handlers::create_service_type,
        service_types_handlers::update_service_type,
        service_types_handlers::delete_service_type,
        // FAQs
        faqs_handlers::list_public_faqs,
        faqs_handlers::list_faq_categories,
        faqs_handlers::list_faqs,
        faqs_handlers::get_faq,
        faqs_handlers::create_faq,
        faqs_handlers::update_faq,
        faqs_handlers::delete_faq,
        // Service requests
        service_requests_handlers::initiate_service_request,
        service_requests_handlers::list_service_requests,
        service_requests_handlers::get_service_request,
        service_requests_handlers::get_service_request_history,
        service_requests_handlers::submit_service_request_form,
        service_requests_handlers::update_service_request_status,
        // Documents
        documents_handlers::upload_document,
        documents_handlers::list_request_documents,
        documents_handlers::get_document,
        documents_handlers::download_document,
        documents_handlers::get_document_url,
        documents_handlers::review_document,
        documents_handlers::delete_document,
        // Payments
        payments_handlers::create_payment,
        payments_handlers::list_payments,
        payments_handlers::get_payment,
        payments_handlers::get_invoice,
        payments_handlers::get_receipt,
        payments_handlers::payment_webhook,
        // Appointments
        appointments_handlers::create_appointment,
        appointments_handlers::list_appointments,
        appointments_handlers::get_appointment,
        appointments_handlers::user_confirm_appointment,
        appointments_handlers::operator_confirm_appointment,
        appointments_handlers::reschedule_appointment,
        appointments_handlers::cancel_appointment,
        appointments_handlers::complete_appointment,
        // Admin
        admin_handlers::list_users,
        admin_handlers::get_user,
        admin_handlers::create_user,
        admin_handlers::update_user,
        admin_handlers::delete_user,
        admin_handlers::assign_permissions,
        admin_handlers::list_roles,
    ),
    components(
        schemas(
            // Shared
            ErrorResponse,
            PaginationMeta,
            // Auth
            auth::model::AuthenticatedUser,
            // Service types
            service_types_models::DocumentRequirement,
            service_types_dtos::CreateServiceTypeDto,
            service_types_dtos::UpdateServiceTypeDto,
            service_types_dtos::ServiceTypeResponseDto,
            // FAQs
            faqs_dtos::CreateFaqDto,
            faqs_dtos::UpdateFaqDto,
            faqs_dtos::FaqResponseDto,
            faqs_dtos::PublicFaqDto,
            // Service requests
            service_requests_models::RequestStatus,
            service_requests_dtos::InitiateServiceRequestDto,
            service_requests_dtos::SubmitFormDto,
            service_requests_dtos::UpdateStatusDto,
            service_requests_dtos::ServiceRequestResponseDto,
            service_requests_dtos::StatusHistoryDto,
            // Documents
            documents_models::DocumentStatus,
            documents_dtos::UploadDocumentForm,
            documents_dtos::ReviewDecision,
            documents_dtos::ReviewDocumentDto,
            documents_dtos::DocumentResponseDto,
            documents_dtos::DocumentUrlDto,
            // Payments
            payments_models::PaymentStatus,
            payments_dtos::CreatePaymentDto,
            payments_dtos::PaymentResponseDto,
            payments_dtos::LineItemDto,
            payments_dtos::InvoiceDto,
            payments_dtos::ReceiptDto,
            payments_dtos::WebhookAckDto,
            // Appointments
            appointments_models::AppointmentState,
            appointments_dtos::CreateAppointmentDto,
            appointments_dtos::RescheduleAppointmentDto,
            appointments_dtos::CancelAppointmentDto,
            appointments_dtos::AppointmentResponseDto,
            // Admin
            admin_dtos::AdminUserDto,
            admin_dtos::CreateUserDto,
            admin_dtos::UpdateUserDto,
            admin_dtos::AssignPermissionsDto,
            admin_dtos::UserPermissionsDto,
            admin_dtos::DeletedUserDto,
            admin_dtos::RoleDto,
        )
    ),
    tags(
        (name = "auth", description = "Authenticated user"),
        (name = "service-types", description = "Services offered and their document requirements"),
        (name = "faqs", description = "Frequently asked questions (public listing, admin management)"),
        (name = "service-requests", description = "Customer service requests and their status workflow"),
        (name = "documents", description = "Documents uploaded for service requests"),
        (name = "payments", description = "Payments, invoices and receipts"),
        (name = "appointments", description = "Appointments between customers and operators"),
        (name = "admin", description = "User management (admin only)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Servicedesk API",
        version = "0.1.0",
        description = "Back-office API for service requests, payments and appointments",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to the OpenAPI document
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_documents_every_feature() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        for path in [
            "/api/v1/auth/me",
            "/api/v1/service-types",
            "/api/v1/faqs/public",
            "/api/v1/service-requests/initiate",
            "/api/v1/service-requests/{id}/documents",
            "/api/v1/documents/{id}/review",
            "/api/v1/payments/{id}/receipt",
            "/api/v1/payments/webhook",
            "/api/v1/appointments/{id}/reschedule",
            "/api/v1/admin/users/{id}/permissions",
            "/api/v1/admin/roles",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
