use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::backend::{insert_as, select_as, DataStore, Query};
use crate::error::{InvoiceError, Result};
use crate::model::{Company, NewCompany};
use crate::validate;

pub const TABLE: &str = "companies";

#[derive(Serialize)]
struct OwnedCompany<'a> {
    user_id: Uuid,
    #[serde(flatten)]
    company: &'a NewCompany,
}

/// Companies owned by `user_id`.
pub fn list_companies<S: DataStore + ?Sized>(store: &S, user_id: Uuid) -> Result<Vec<Company>> {
    select_as(store, &Query::table(TABLE).eq("user_id", user_id))
}

/// Ids only, for scoping clients and invoices to the user's companies.
pub fn company_ids<S: DataStore + ?Sized>(store: &S, user_id: Uuid) -> Result<Vec<Uuid>> {
    let rows = store.select(&Query::table(TABLE).select("id").eq("user_id", user_id))?;
    rows.into_iter()
        .map(|row| serde_json::from_value(row["id"].clone()).map_err(Into::into))
        .collect()
}

pub fn create_company<S: DataStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    company: &NewCompany,
) -> Result<Company> {
    let company = NewCompany {
        name: validate::required("Company name", &company.name)?.to_string(),
        email: validate::optional_email(&company.email)?.to_string(),
        ..company.clone()
    };

    let mut created: Vec<Company> = insert_as(
        store,
        TABLE,
        &[OwnedCompany {
            user_id,
            company: &company,
        }],
    )?;
    let created = created
        .pop()
        .ok_or_else(|| InvoiceError::CompanyNotFound(company.name.clone()))?;
    info!(company = %created.id, "company created");
    Ok(created)
}

/// Pick a company by id or (case-insensitive) name. No reference means the
/// first one, which is what the editor preselects.
pub fn find_company<'a>(companies: &'a [Company], reference: Option<&str>) -> Result<&'a Company> {
    match reference {
        None => companies.first().ok_or(InvoiceError::OnboardingRequired),
        Some(r) => companies
            .iter()
            .find(|c| c.id.to_string() == r || c.name.eq_ignore_ascii_case(r))
            .ok_or_else(|| InvoiceError::CompanyNotFound(r.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryStore;
    use serde_json::json;

    #[test]
    fn create_stamps_owner_and_lists_only_own() {
        let store = MemoryStore::new();
        let me = Uuid::new_v4();
        store.seed(TABLE, json!({ "user_id": Uuid::new_v4(), "name": "Someone Else" }));

        let created = create_company(
            &store,
            me,
            &NewCompany {
                name: "  Acme Ltd ".to_string(),
                email: "billing@acme.test".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(created.name, "Acme Ltd");
        assert_eq!(created.user_id, me);

        let mine = list_companies(&store, me).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(company_ids(&store, me).unwrap(), vec![created.id]);
    }

    #[test]
    fn create_requires_name_and_valid_email() {
        let store = MemoryStore::new();
        let err = create_company(&store, Uuid::new_v4(), &NewCompany::default()).unwrap_err();
        assert!(err.to_string().contains("Company name is required"));

        let err = create_company(
            &store,
            Uuid::new_v4(),
            &NewCompany {
                name: "Acme".to_string(),
                email: "not-an-email".to_string(),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid email"));
        assert!(store.rows(TABLE).is_empty());
    }

    #[test]
    fn find_by_name_or_default_first() {
        let store = MemoryStore::new();
        let me = Uuid::new_v4();
        for name in ["Alpha", "Beta"] {
            store.seed(TABLE, json!({ "user_id": me, "name": name }));
        }
        let companies = list_companies(&store, me).unwrap();

        assert_eq!(find_company(&companies, None).unwrap().name, "Alpha");
        assert_eq!(find_company(&companies, Some("beta")).unwrap().name, "Beta");
        assert!(matches!(
            find_company(&companies, Some("Gamma")),
            Err(InvoiceError::CompanyNotFound(_))
        ));
        assert!(matches!(
            find_company(&[], None),
            Err(InvoiceError::OnboardingRequired)
        ));
    }
}
