//! Account service
//!
//! Accounts, AWS credentials and AWS external ids under `/setup`.

use super::operation::{no_input, Operation};
use crate::api::request::{required, Request};
use crate::api::Client;
use crate::config::CallOptions;
use crate::error::Result;
use crate::field::Field;
use crate::selective::{Directives, ObjectWriter, Resource, NO_DIRECTIVES};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;

/// A Spot account
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Account {
    #[serde(skip)]
    pub directives: Directives,
    pub id: Field<String>,
    pub name: Field<String>,
    pub organization_id: Field<String>,
    /// Cloud provider account id linked to this account
    pub provider_external_id: Field<String>,
}

impl Account {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Field::Set(name.into()),
            ..Self::default()
        }
    }
}

impl Resource for Account {
    fn directives(&self) -> &Directives {
        &self.directives
    }

    fn write_fields(&self, w: &mut ObjectWriter<'_>) -> Result<()> {
        w.field("id", &self.id)?;
        w.field("name", &self.name)?;
        w.field("organizationId", &self.organization_id)?;
        w.field("providerExternalId", &self.provider_external_id)
    }
}

/// AWS credentials of an account
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Credential {
    #[serde(skip)]
    pub directives: Directives,
    pub iam_role: Field<String>,
    pub account_id: Field<String>,
}

impl Resource for Credential {
    fn directives(&self) -> &Directives {
        &self.directives
    }

    fn write_fields(&self, w: &mut ObjectWriter<'_>) -> Result<()> {
        w.field("iamRole", &self.iam_role)?;
        w.field("accountId", &self.account_id)
    }
}

/// External id used when trusting the platform from an AWS IAM role
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AwsAccountExternalId {
    pub external_id: Field<String>,
    pub created_at: Field<DateTime<Utc>>,
    pub updated_at: Field<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateAccountInput {
    pub account: Account,
}

impl Resource for CreateAccountInput {
    fn directives(&self) -> &Directives {
        &NO_DIRECTIVES
    }

    fn write_fields(&self, w: &mut ObjectWriter<'_>) -> Result<()> {
        w.embed("account", &self.account)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadAccountInput {
    pub account_id: Field<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateAccountInput {
    /// `id` selects the account and is not sent in the body
    pub account: Account,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteAccountInput {
    pub account_id: Field<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListAccountsInput;

#[derive(Debug, Clone, Default)]
pub struct SetCredentialInput {
    pub credential: Credential,
}

impl Resource for SetCredentialInput {
    fn directives(&self) -> &Directives {
        &NO_DIRECTIVES
    }

    fn write_fields(&self, w: &mut ObjectWriter<'_>) -> Result<()> {
        w.embed("credentials", &self.credential)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateAwsAccountExternalIdInput {
    pub account_id: Field<String>,
}

fn encode_create(input: &CreateAccountInput, r: &mut Request) -> Result<()> {
    r.body(input)
}

fn encode_read(input: &ReadAccountInput, r: &mut Request) -> Result<()> {
    r.path_param("accountId", required(&input.account_id, "accountId")?)
}

fn encode_update(input: &UpdateAccountInput, r: &mut Request) -> Result<()> {
    r.path_param("accountId", required(&input.account.id, "account.id")?)?;
    let mut account = input.account.clone();
    account.id = Field::Absent;
    r.body(&CreateAccountInput { account })
}

fn encode_delete(input: &DeleteAccountInput, r: &mut Request) -> Result<()> {
    r.path_param("accountId", required(&input.account_id, "accountId")?)
}

fn encode_set_credential(input: &SetCredentialInput, r: &mut Request) -> Result<()> {
    r.body(input)
}

fn encode_external_id(input: &CreateAwsAccountExternalIdInput, r: &mut Request) -> Result<()> {
    r.set_param("accountId", required(&input.account_id, "accountId")?.as_str());
    Ok(())
}

pub const CREATE_ACCOUNT: Operation<CreateAccountInput, Account> =
    Operation::new("CreateAccount", Method::POST, "/setup/account", encode_create);

pub const READ_ACCOUNT: Operation<ReadAccountInput, Account> =
    Operation::new("ReadAccount", Method::GET, "/setup/account/{accountId}", encode_read);

pub const UPDATE_ACCOUNT: Operation<UpdateAccountInput, Account> =
    Operation::new("UpdateAccount", Method::PUT, "/setup/account/{accountId}", encode_update);

pub const DELETE_ACCOUNT: Operation<DeleteAccountInput, serde_json::Value> =
    Operation::new("DeleteAccount", Method::DELETE, "/setup/account/{accountId}", encode_delete);

pub const LIST_ACCOUNTS: Operation<ListAccountsInput, Account> =
    Operation::new("ListAccounts", Method::GET, "/setup/account", no_input);

pub const SET_CREDENTIAL: Operation<SetCredentialInput, Credential> = Operation::new(
    "SetCredential",
    Method::POST,
    "/setup/credentials/aws",
    encode_set_credential,
);

pub const CREATE_AWS_ACCOUNT_EXTERNAL_ID: Operation<CreateAwsAccountExternalIdInput, AwsAccountExternalId> =
    Operation::new(
        "CreateAwsAccountExternalId",
        Method::POST,
        "/setup/credentials/aws/externalId",
        encode_external_id,
    );

/// Typed facade over the account operations
#[derive(Clone)]
pub struct AccountService {
    client: Client,
}

impl AccountService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn create_account(&self, input: &CreateAccountInput, options: &CallOptions) -> Result<Option<Account>> {
        self.client.call_one(&CREATE_ACCOUNT, input, options).await
    }

    pub async fn read_account(&self, input: &ReadAccountInput, options: &CallOptions) -> Result<Option<Account>> {
        self.client.call_one(&READ_ACCOUNT, input, options).await
    }

    pub async fn update_account(&self, input: &UpdateAccountInput, options: &CallOptions) -> Result<Option<Account>> {
        self.client.call_one(&UPDATE_ACCOUNT, input, options).await
    }

    pub async fn delete_account(&self, input: &DeleteAccountInput, options: &CallOptions) -> Result<()> {
        let request = DELETE_ACCOUNT.build(input)?;
        self.client.execute(request, options).await?;
        Ok(())
    }

    /// Every account visible to the token, across pages
    pub async fn list_accounts(&self, options: &CallOptions) -> Result<Vec<Account>> {
        self.client.call_all(&LIST_ACCOUNTS, &ListAccountsInput, options).await
    }

    pub async fn set_credential(&self, input: &SetCredentialInput, options: &CallOptions) -> Result<Option<Credential>> {
        self.client.call_one(&SET_CREDENTIAL, input, options).await
    }

    pub async fn create_aws_account_external_id(
        &self,
        input: &CreateAwsAccountExternalIdInput,
        options: &CallOptions,
    ) -> Result<Option<AwsAccountExternalId>> {
        self.client
            .call_one(&CREATE_AWS_ACCOUNT_EXTERNAL_ID, input, options)
            .await
    }
}
