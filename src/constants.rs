pub mod vibe {

    pub const DEFAULT_MATCH: i32 = 70;

    pub const MIN_MATCH: i32 = 30;

    pub const MAX_MATCH: i32 = 100;
}

pub mod tokens {

    /// Raw one-time tokens are this many random bytes (hex encoded on the wire).
    pub const ONE_TIME_TOKEN_BYTES: usize = 32;

    pub const ONE_TIME_TOKEN_HEX_LEN: usize = ONE_TIME_TOKEN_BYTES * 2;

    pub const MIN_JWT_SECRET_BYTES: usize = 32;

    /// Secrets that have circulated in sample configs and must never sign tokens.
    pub const KNOWN_PLACEHOLDER_SECRETS: &[&str] = &[
        "change-me-in-production",
        "changeme",
        "secret",
        "your-secret-key",
    ];
}

pub mod limits {

    pub const MIN_PASSWORD_LEN: usize = 8;

    pub const MAX_USERNAME_LEN: usize = 150;

    pub const MAX_USER_AGENT_LEN: usize = 500;

    pub const MAX_DEVICE_NAME_LEN: usize = 255;
}

pub mod messages {

    pub const RESEND_VERIFICATION: &str =
        "If the email exists in our system, you will receive a verification email.";

    pub const PASSWORD_RESET_REQUESTED: &str = "If the email exists in our system, you will receive an email with instructions to reset your password.";
}
