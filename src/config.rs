// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    // Payment processor configuration
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub platform_fee_percent: i64,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        let app_url = std::env::var("APP_URL").expect("APP_URL must be set");

        // Payment processor configuration (with defaults for local runs)
        let stripe_secret_key = std::env::var("STRIPE_SECRET_KEY")
            .unwrap_or_else(|_| "sk_test_secret_key".to_string());
        let stripe_webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .unwrap_or_else(|_| "whsec_test_secret".to_string());

        // Canonical platform fee. Every release deducts this percentage before
        // the payout transfer is created.
        let platform_fee_percent = std::env::var("PLATFORM_FEE_PERCENT")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<i64>()
            .expect("PLATFORM_FEE_PERCENT must be an integer");

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .expect("PORT must be a number");

        Config {
            database_url,
            app_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            port,
            stripe_secret_key,
            stripe_webhook_secret,
            platform_fee_percent,
        }
    }
}
