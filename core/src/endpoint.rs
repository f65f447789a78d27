//! Fixed endpoint paths and the parameters sent with every request.

/// Value of the `platform` parameter.
pub const PLATFORM: &str = "web";
/// Value of the `origin` parameter.
pub const ORIGIN: &str = "web,ib5,platform";
/// Value of the `appName` parameter.
pub const APP_NAME: &str = "mvno";

const API_PREFIX: &str = "/api/mobile-operator";

/// One variant per remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Session,
    SessionStatus,
    SignupByPhone,
    ConfirmSignupByPhone,
    ContractsInfo,
    SubscriberServices,
    BundleAccounts,
    AutoPayments,
}

impl Endpoint {
    /// Path relative to the API prefix.
    pub const fn suffix(self) -> &'static str {
        match self {
            Endpoint::Session => "/util/session",
            Endpoint::SessionStatus => "/util/session_status",
            Endpoint::SignupByPhone => "/auth/signup_by_phone_web",
            Endpoint::ConfirmSignupByPhone => "/auth/confirm_signup_by_phone_web",
            Endpoint::ContractsInfo => "/user/contracts_info",
            Endpoint::SubscriberServices => "/user/subscriber_services",
            Endpoint::BundleAccounts => "/user/bundle_accounts",
            Endpoint::AutoPayments => "/payment/get_autopayments",
        }
    }

    /// Absolute path on the service origin.
    pub fn path(self) -> String {
        format!("{API_PREFIX}{}", self.suffix())
    }
}

/// The `platform`/`origin`/`appName` triple, in the order it is appended.
pub fn constant_params() -> [(&'static str, &'static str); 3] {
    [("platform", PLATFORM), ("origin", ORIGIN), ("appName", APP_NAME)]
}
