use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;

use crate::engine::{EngineConfig, geo, matching};

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_scan_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Attendance engine policy
    pub time_zone: Tz,
    pub match_tolerance: f64,
    pub geofence_radius_km: f64,

    // Face encoder sidecar
    pub encoder_url: String,
    pub encoder_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl: env::var("ACCESS_TOKEN_TTL")
                .unwrap_or_else(|_| "900".to_string()) // default 15 min
                .parse()
                .expect("ACCESS_TOKEN_TTL must be a number"),
            refresh_token_ttl: env::var("REFRESH_TOKEN_TTL")
                .unwrap_or_else(|_| "604800".to_string()) // default 7 days
                .parse()
                .expect("REFRESH_TOKEN_TTL must be a number"),

            rate_login_per_min: env::var("RATE_LOGIN_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("RATE_LOGIN_PER_MIN must be a number"),
            rate_scan_per_min: env::var("RATE_SCAN_PER_MIN")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .expect("RATE_SCAN_PER_MIN must be a number"),
            rate_refresh_per_min: env::var("RATE_REFRESH_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("RATE_REFRESH_PER_MIN must be a number"),
            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .expect("RATE_PROTECTED_PER_MIN must be a number"),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            time_zone: env::var("TIME_ZONE")
                .unwrap_or_else(|_| "Asia/Kolkata".to_string())
                .parse()
                .expect("TIME_ZONE must be a valid IANA zone name"),
            match_tolerance: env::var("FACE_MATCH_TOLERANCE")
                .unwrap_or_else(|_| matching::DEFAULT_TOLERANCE.to_string())
                .parse()
                .expect("FACE_MATCH_TOLERANCE must be a number"),
            geofence_radius_km: env::var("GEOFENCE_RADIUS_KM")
                .unwrap_or_else(|_| geo::DEFAULT_RADIUS_KM.to_string())
                .parse()
                .expect("GEOFENCE_RADIUS_KM must be a number"),

            encoder_url: env::var("ENCODER_URL").expect("ENCODER_URL must be set"),
            encoder_timeout_secs: env::var("ENCODER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("ENCODER_TIMEOUT_SECS must be a number"),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            tolerance: self.match_tolerance,
            radius_km: self.geofence_radius_km,
            tz: self.time_zone,
        }
    }
}
