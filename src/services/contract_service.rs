// src/services/contract_service.rs

use std::sync::Arc;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{PartnerRepository, TenantRepository},
    integrations::esign::{EnvelopeRequest, SignatureGateway},
    middleware::tenancy::TenantContext,
    models::{
        notifications::{NotificationMessage, KIND_CONTRACT_SENT},
        partners::{Carrier, ContractSent, SendContractPayload, SignatureStatus},
        tenancy::AppRole,
    },
    services::notification_service::NotificationService,
};

/// Guarda informativa: contrato assinado ou já em andamento não é reenviado.
pub fn check_can_send(carrier: &Carrier) -> Result<(), AppError> {
    if carrier.contract_signed || carrier.signature_status == SignatureStatus::Completed {
        return Err(AppError::AlreadySigned);
    }
    if carrier.signature_status == SignatureStatus::Sent {
        return Err(AppError::AlreadySent);
    }
    Ok(())
}

#[derive(Clone)]
pub struct ContractService {
    partner_repo: PartnerRepository,
    tenant_repo: TenantRepository,
    gateway: Arc<dyn SignatureGateway>,
    notification_service: NotificationService,
}

impl ContractService {
    pub fn new(
        partner_repo: PartnerRepository,
        tenant_repo: TenantRepository,
        gateway: Arc<dyn SignatureGateway>,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            partner_repo,
            tenant_repo,
            gateway,
            notification_service,
        }
    }

    pub async fn send_contract(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        carrier_id: Uuid,
        payload: &SendContractPayload,
    ) -> Result<ContractSent, AppError> {
        let tenant_id = ctx.tenant_id()?;
        let carrier = self
            .partner_repo
            .find_carrier(&mut *conn, Some(tenant_id), carrier_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Carrier".to_string()))?;

        check_can_send(&carrier)?;

        let company_name = self
            .tenant_repo
            .find_company(&mut *conn, tenant_id)
            .await?
            .map(|c| c.name)
            .unwrap_or_default();

        let request = EnvelopeRequest {
            signer_email: payload.signer_email.clone(),
            signer_name: payload.signer_name.clone(),
            carrier_name: carrier.name.clone(),
            company_name,
        };

        tracing::info!("✍️ Enviando contrato da transportadora {} para assinatura", carrier.id);
        let envelope_id = self.gateway.send_envelope(&request).await?;

        // Outra requisição pode ter enviado no meio tempo
        let updated = self
            .partner_repo
            .mark_contract_sent(&mut *conn, tenant_id, carrier.id, &envelope_id)
            .await?
            .ok_or(AppError::AlreadySent)?;

        let msg = NotificationMessage {
            kind: KIND_CONTRACT_SENT,
            title: "Contract Sent".to_string(),
            message: format!("Contract sent to {} for signature.", payload.signer_name),
            link: Some("/carriers".to_string()),
        };
        self.notification_service
            .fan_out_best_effort(conn, tenant_id, &[AppRole::Admin], &msg)
            .await;

        Ok(ContractSent {
            carrier_id: updated.id,
            envelope_id,
            signature_status: updated.signature_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn carrier(status: SignatureStatus, signed: bool) -> Carrier {
        Carrier {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Road Runner LLC".into(),
            email: None,
            phone: None,
            address: None,
            mc_number: None,
            dot_number: None,
            insurance_expiry: None,
            notes: None,
            envelope_id: None,
            signature_status: status,
            contract_signed: signed,
            contract_signed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn in_flight_contract_is_not_resent() {
        assert!(matches!(check_can_send(&carrier(SignatureStatus::Sent, false)), Err(AppError::AlreadySent)));
    }

    #[test]
    fn signed_contract_is_not_resent() {
        assert!(matches!(check_can_send(&carrier(SignatureStatus::Completed, true)), Err(AppError::AlreadySigned)));
        assert!(matches!(check_can_send(&carrier(SignatureStatus::Voided, true)), Err(AppError::AlreadySigned)));
    }

    #[test]
    fn declined_or_voided_contracts_can_be_sent_again() {
        for status in [SignatureStatus::NotSent, SignatureStatus::Declined, SignatureStatus::Voided] {
            assert!(check_can_send(&carrier(status, false)).is_ok());
        }
    }
}
