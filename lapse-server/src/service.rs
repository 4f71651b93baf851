use lapse_core::{
    hash_token, ExpiringStore, OtpStore, TokenBlacklist, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT,
};
use lapse_proto::lapse_server::Lapse;
use lapse_proto::{
    BlacklistTokenRequest, BlacklistTokenResponse, ClearRequest, ClearResponse, ContainsRequest,
    ContainsResponse, DeleteOtpRequest, DeleteOtpResponse, DeleteRequest, DeleteResponse,
    GetOtpRequest, GetOtpResponse, GetRequest, GetResponse, IsTokenBlacklistedRequest,
    IsTokenBlacklistedResponse, PurgeExpiredRequest, PurgeExpiredResponse, SearchKeysRequest,
    SearchKeysResponse, SetOtpRequest, SetOtpResponse, SetRequest, SetResponse, VerifyOtpRequest,
    VerifyOtpResponse,
};
use std::time::Duration;
use tonic::{Request, Response, Status};

/// Maximum allowed key length (1 KB)
const MAX_KEY_LENGTH: usize = 1024;

/// Maximum allowed value length (1 MB)
const MAX_VALUE_LENGTH: usize = 1024 * 1024;

/// Maximum allowed prefix length for search operations
const MAX_PREFIX_LENGTH: usize = 256;

/// Maximum allowed skip value for search pagination
const MAX_SKIP: u32 = 10000;

/// Truncates a key for logging so stored identifiers don't leak in full
fn truncate_key_for_log(key: &str) -> String {
    const MAX_LOG_LEN: usize = 16;
    if key.len() <= MAX_LOG_LEN {
        key.to_string()
    } else {
        let mut end = MAX_LOG_LEN;
        while !key.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &key[..end])
    }
}

/// Validates that a key (or email) is non-empty and within size limits
fn validate_key(field: &str, key: &str) -> Result<(), Status> {
    if key.is_empty() {
        return Err(Status::invalid_argument(format!("{field} cannot be empty")));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(Status::invalid_argument(format!(
            "{field} exceeds maximum length of {MAX_KEY_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// Validates that a value is within size limits
fn validate_value(field: &str, value: &str) -> Result<(), Status> {
    if value.len() > MAX_VALUE_LENGTH {
        return Err(Status::invalid_argument(format!(
            "{field} exceeds maximum length of {MAX_VALUE_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// The stores one server process hands to its request handlers
#[derive(Debug, Clone, Default)]
pub struct Stores {
    pub cache: ExpiringStore<String>,
    pub otp: OtpStore,
    pub blacklist: TokenBlacklist,
}

/// The gRPC service implementation
pub struct LapseService {
    stores: Stores,
}

impl LapseService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }
}

#[tonic::async_trait]
impl Lapse for LapseService {
    async fn get(&self, request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        let key = &request.get_ref().key;
        validate_key("Key", key)?;
        tracing::debug!("GET {}", truncate_key_for_log(key));

        let value = self.stores.cache.get(key);
        Ok(Response::new(GetResponse { value }))
    }

    async fn set(&self, request: Request<SetRequest>) -> Result<Response<SetResponse>, Status> {
        let req = request.into_inner();
        validate_key("Key", &req.key)?;
        validate_value("Value", &req.value)?;

        let ttl = (req.ttl_seconds > 0).then_some(req.ttl_seconds);
        tracing::debug!("SET {} (ttl: {:?})", truncate_key_for_log(&req.key), ttl);

        self.stores.cache.set(req.key, req.value, ttl);
        Ok(Response::new(SetResponse { success: true }))
    }

    async fn delete(
        &self,
        request: Request<DeleteRequest>,
    ) -> Result<Response<DeleteResponse>, Status> {
        let key = &request.get_ref().key;
        validate_key("Key", key)?;
        tracing::debug!("DELETE {}", truncate_key_for_log(key));

        let deleted = self.stores.cache.delete(key);
        Ok(Response::new(DeleteResponse { deleted }))
    }

    async fn clear(
        &self,
        _request: Request<ClearRequest>,
    ) -> Result<Response<ClearResponse>, Status> {
        let deleted_count = self.stores.cache.clear() as u64;
        tracing::info!("CLEAR removed {} entries", deleted_count);

        Ok(Response::new(ClearResponse { deleted_count }))
    }

    async fn contains(
        &self,
        request: Request<ContainsRequest>,
    ) -> Result<Response<ContainsResponse>, Status> {
        let key = &request.get_ref().key;
        validate_key("Key", key)?;
        tracing::debug!("CONTAINS {}", truncate_key_for_log(key));

        let exists = self.stores.cache.contains_key(key);
        Ok(Response::new(ContainsResponse { exists }))
    }

    async fn search_keys(
        &self,
        request: Request<SearchKeysRequest>,
    ) -> Result<Response<SearchKeysResponse>, Status> {
        let req = request.get_ref();

        if req.prefix.len() > MAX_PREFIX_LENGTH {
            return Err(Status::invalid_argument(format!(
                "Prefix exceeds maximum length of {MAX_PREFIX_LENGTH} bytes"
            )));
        }
        if req.skip > MAX_SKIP {
            return Err(Status::invalid_argument(format!(
                "Skip value exceeds maximum of {MAX_SKIP}"
            )));
        }

        // 0 = default, otherwise capped
        let limit = if req.limit == 0 {
            DEFAULT_SEARCH_LIMIT
        } else {
            (req.limit as usize).min(MAX_SEARCH_LIMIT)
        };
        let skip = req.skip as usize;

        tracing::debug!(
            "SEARCH_KEYS prefix={} limit={} skip={}",
            truncate_key_for_log(&req.prefix),
            limit,
            skip
        );

        let (keys, total_count) = self.stores.cache.search_keys(&req.prefix, Some(limit), Some(skip));

        Ok(Response::new(SearchKeysResponse {
            keys,
            total_count: total_count as u64,
        }))
    }

    async fn purge_expired(
        &self,
        _request: Request<PurgeExpiredRequest>,
    ) -> Result<Response<PurgeExpiredResponse>, Status> {
        let removed_count = self.stores.cache.purge_expired() as u64;
        tracing::debug!("PURGE_EXPIRED removed {}", removed_count);

        Ok(Response::new(PurgeExpiredResponse { removed_count }))
    }

    async fn set_otp(
        &self,
        request: Request<SetOtpRequest>,
    ) -> Result<Response<SetOtpResponse>, Status> {
        let req = request.into_inner();
        validate_key("Email", &req.email)?;

        let code = match req.code {
            Some(code) if !code.is_empty() => {
                validate_key("Code", &code)?;
                code
            }
            _ => self.stores.otp.generate_otp(),
        };

        if req.ttl_seconds > 0 {
            self.stores
                .otp
                .set_otp_with_ttl(&req.email, code.clone(), Duration::from_secs(req.ttl_seconds));
        } else {
            self.stores.otp.set_otp(&req.email, code.clone());
        }
        tracing::debug!("SET_OTP {}", truncate_key_for_log(&req.email));

        Ok(Response::new(SetOtpResponse { code }))
    }

    async fn get_otp(
        &self,
        request: Request<GetOtpRequest>,
    ) -> Result<Response<GetOtpResponse>, Status> {
        let email = &request.get_ref().email;
        validate_key("Email", email)?;
        tracing::debug!("GET_OTP {}", truncate_key_for_log(email));

        let code = self.stores.otp.get_otp(email);
        Ok(Response::new(GetOtpResponse { code }))
    }

    async fn verify_otp(
        &self,
        request: Request<VerifyOtpRequest>,
    ) -> Result<Response<VerifyOtpResponse>, Status> {
        let req = request.get_ref();
        validate_key("Email", &req.email)?;

        let valid = self.stores.otp.verify_otp(&req.email, &req.code);
        tracing::debug!("VERIFY_OTP {} valid={}", truncate_key_for_log(&req.email), valid);

        Ok(Response::new(VerifyOtpResponse { valid }))
    }

    async fn delete_otp(
        &self,
        request: Request<DeleteOtpRequest>,
    ) -> Result<Response<DeleteOtpResponse>, Status> {
        let email = &request.get_ref().email;
        validate_key("Email", email)?;
        tracing::debug!("DELETE_OTP {}", truncate_key_for_log(email));

        let deleted = self.stores.otp.delete_otp(email);
        Ok(Response::new(DeleteOtpResponse { deleted }))
    }

    async fn blacklist_token(
        &self,
        request: Request<BlacklistTokenRequest>,
    ) -> Result<Response<BlacklistTokenResponse>, Status> {
        let req = request.get_ref();
        validate_value("Token", &req.token)?;
        if req.token.is_empty() {
            return Err(Status::invalid_argument("Token cannot be empty"));
        }
        if req.ttl_seconds == 0 {
            return Err(Status::invalid_argument("ttl_seconds must be greater than 0"));
        }

        let token_hash = hash_token(&req.token);
        tracing::debug!(
            "BLACKLIST {} (ttl: {}s)",
            truncate_key_for_log(&token_hash),
            req.ttl_seconds
        );
        self.stores.blacklist.blacklist_token(&token_hash, req.ttl_seconds);

        Ok(Response::new(BlacklistTokenResponse { success: true }))
    }

    async fn is_token_blacklisted(
        &self,
        request: Request<IsTokenBlacklistedRequest>,
    ) -> Result<Response<IsTokenBlacklistedResponse>, Status> {
        let token = &request.get_ref().token;
        if token.is_empty() {
            return Err(Status::invalid_argument("Token cannot be empty"));
        }

        let blacklisted = self.stores.blacklist.is_token_blacklisted(&hash_token(token));
        Ok(Response::new(IsTokenBlacklistedResponse { blacklisted }))
    }
}
