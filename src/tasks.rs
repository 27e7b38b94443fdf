//! Task prompts for partner-platform requests (`--compose`).
//!
//! A composed request names an `action` instead of spelling out the task; the
//! prompt is built here from a per-action template.

use serde_json::Value;

use crate::input::TaskRequest;
use crate::{Error, Result};

/// Partner platforms with known entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Swiggy,
    Zomato,
    Magicpin,
}

impl Platform {
    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "swiggy" => Some(Platform::Swiggy),
            "zomato" => Some(Platform::Zomato),
            "magicpin" => Some(Platform::Magicpin),
            _ => None,
        }
    }

    pub fn login_url(&self) -> &'static str {
        match self {
            Platform::Swiggy => "https://partner.swiggy.com/login",
            Platform::Zomato => "https://www.zomato.com/partner/login",
            Platform::Magicpin => "https://magicpin.in/partners/adminDashboard",
        }
    }

    pub fn dashboard_url(&self) -> &'static str {
        match self {
            Platform::Swiggy => "https://partner.swiggy.com/dashboard",
            Platform::Zomato => "https://www.zomato.com/partner/dashboard",
            Platform::Magicpin => "https://magicpin.in/partners/dashboard",
        }
    }
}

/// Build the task text for a request that carries an `action`.
pub fn compose(request: &TaskRequest) -> Result<String> {
    let action = request
        .action
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| Error::MalformedInput("missing \"task\" or \"action\" field".into()))?;
    let platform = request.platform();

    match action {
        "login" => login_task(request, platform),
        "check_login" => {
            let url = resolve_url(request, platform, Platform::dashboard_url)?;
            Ok(check_login_task(&url))
        }
        "extract_data" => {
            let url = resolve_url(request, platform, Platform::dashboard_url)?;
            let data_type = request.data_type.as_deref().unwrap_or("dashboard");
            Ok(extract_data_task(&url, data_type, request.filters.as_ref()))
        }
        other => Ok(action_task(platform, other, request.data.as_ref())),
    }
}

/// Explicit `url` wins; otherwise the platform's known page.
fn resolve_url(
    request: &TaskRequest,
    platform: &str,
    page: fn(&Platform) -> &'static str,
) -> Result<String> {
    if let Some(url) = request.url.as_deref().filter(|u| !u.trim().is_empty()) {
        return Ok(url.to_string());
    }
    Platform::from_name(platform)
        .map(|p| page(&p).to_string())
        .ok_or_else(|| {
            Error::MalformedInput(format!(
                "unsupported platform {:?} (pass \"url\" to target it)",
                platform
            ))
        })
}

fn login_task(request: &TaskRequest, platform: &str) -> Result<String> {
    let credentials = request
        .credentials
        .as_ref()
        .ok_or_else(|| Error::MalformedInput("login requires \"credentials\"".into()))?;
    let url = resolve_url(request, platform, Platform::login_url)?;

    Ok(format!(
        "Navigate to {url} and perform login operation with the following steps:\n\
         1. First check if already logged in by looking for dashboard elements or user profile\n\
         2. If already logged in, return success with current URL and login status\n\
         3. If not logged in, proceed with login:\n\
         \x20  - Find and click on the username/email input field\n\
         \x20  - Enter the username: {username}\n\
         \x20  - Find and click on the password input field\n\
         \x20  - Enter the password: {password}\n\
         \x20  - Find and click the login/submit button\n\
         \x20  - Wait for the page to load and verify successful login\n\
         4. Return the current page URL, login status, and any relevant dashboard information\n\
         5. If login fails, provide specific error details",
        url = url,
        username = credentials.username,
        password = credentials.password,
    ))
}

fn check_login_task(url: &str) -> String {
    format!(
        "Navigate to {url} and check current login status:\n\
         1. Load the page and wait for it to fully render\n\
         2. Check if user is currently logged in by looking for dashboard elements, \
         user profile information, navigation menus, or any login-required content\n\
         3. If logged in, extract key information like the current user/restaurant name, \
         dashboard metrics if visible, and available menu options\n\
         4. If not logged in, note what login elements are visible\n\
         5. Return detailed status about login state and available information",
        url = url
    )
}

fn extract_data_task(url: &str, data_type: &str, filters: Option<&Value>) -> String {
    let base = format!("Navigate directly to {} and extract {} data", url, data_type);
    let filters = filters
        .filter(|f| !f.is_null())
        .map(|f| format!("\nApply filters: {}", f))
        .unwrap_or_default();

    match data_type {
        "views" => format!(
            "{}. Extract view/visit information including:\n\
             - Total page views from all dashboard sections\n\
             - Visit statistics and metrics\n\
             - Traffic data and engagement numbers\n\
             - View counts from different tabs and sections\n\
             Navigate through all available tabs to collect comprehensive view data.{}",
            base, filters
        ),
        "orders" => format!(
            "{}. Extract recent order information including:\n\
             - Order counts and trends\n\
             - Revenue figures\n\
             - Average order values\n\
             - Peak hours data\n\
             Navigate to orders section in the dashboard.{}",
            base, filters
        ),
        "ratings" => format!(
            "{}. Extract rating and review information:\n\
             - Current overall rating\n\
             - Recent rating trends\n\
             - Customer feedback summary\n\
             - Areas for improvement\n\
             Navigate to ratings/reviews section in the dashboard.",
            base
        ),
        "menu" => format!(
            "{}. Extract menu information:\n\
             - Available items and categories\n\
             - Pricing information\n\
             - Item availability status\n\
             - Popular items data\n\
             Navigate to menu management section in the dashboard.",
            base
        ),
        "analytics" | "dashboard" => format!(
            "{}. Extract analytics and performance data:\n\
             - Revenue metrics\n\
             - Order volume trends\n\
             - Customer satisfaction scores\n\
             - Platform-specific insights\n\
             - View/visit statistics\n\
             - Performance indicators\n\
             Navigate through all dashboard sections and tabs to collect comprehensive data.",
            base
        ),
        other => format!(
            "{}. Extract available information of type: {}\n\
             Navigate to relevant sections in the dashboard to collect the requested data.",
            base, other
        ),
    }
}

fn action_task(platform: &str, action: &str, data: Option<&Value>) -> String {
    let base = format!("On {} platform, execute the following action: {}", platform, action);
    let data = match data {
        Some(data) if !data.is_null() => data,
        _ => return base,
    };

    match action {
        "create_offer" => format!(
            "{}. Create a new offer with these details:\n\
             - Title: {}\n\
             - Discount: {}\n\
             - Valid until: {}\n\
             - Description: {}\n\
             - Applicable items: {}",
            base,
            field(data, "title", "Special Offer"),
            field(data, "discount", "10%"),
            field(data, "validUntil", "End of day"),
            field(data, "description", "Limited time offer"),
            field(data, "items", "All items"),
        ),
        "update_timing" => format!(
            "{}. Update store timings:\n\
             - Opening time: {}\n\
             - Closing time: {}\n\
             - Days: {}\n\
             - Special hours: {}",
            base,
            field(data, "openTime", "09:00"),
            field(data, "closeTime", "23:00"),
            field(data, "days", "All days"),
            field(data, "specialHours", "None"),
        ),
        "toggle_status" => format!(
            "{}. Toggle store status to: {}\n\
             - Reason: {}\n\
             - Duration: {}",
            base,
            field(data, "status", "online"),
            field(data, "reason", "Manual update"),
            field(data, "duration", "Indefinite"),
        ),
        "update_menu" => format!(
            "{}. Update menu items:\n\
             - Items to add: {}\n\
             - Items to remove: {}\n\
             - Items to modify: {}\n\
             - Category changes: {}",
            base,
            field(data, "addItems", "[]"),
            field(data, "removeItems", "[]"),
            field(data, "modifyItems", "[]"),
            field(data, "categoryChanges", "[]"),
        ),
        _ => format!("{}. Additional data: {}", base, data),
    }
}

/// String fields verbatim, anything else as JSON, `default` when absent or empty.
fn field(data: &Value, key: &str, default: &str) -> String {
    match data.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) if s.is_empty() => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
