use renthub_types::api::CreateListingRequest;

use crate::error::ApiError;

pub const MAX_IMAGES: usize = 10;

const MAX_TITLE: usize = 120;
const MAX_CONTENT: usize = 2000;

/// Field-by-field payload validation; the first offending field wins.
pub fn validate_listing(payload: &CreateListingRequest) -> Result<(), ApiError> {
    let title_len = payload.title.chars().count();
    if title_len < 2 || title_len > MAX_TITLE {
        return Err(ApiError::validation(
            "title",
            "title must be 2 to 120 characters",
        ));
    }

    let content_len = payload.content.chars().count();
    if content_len < 10 || content_len > MAX_CONTENT {
        return Err(ApiError::validation(
            "content",
            "description must be 10 to 2000 characters",
        ));
    }

    if payload.price < 1 {
        return Err(ApiError::validation("price", "price must be at least 1"));
    }

    if !payload.area.is_finite() || payload.area <= 0.0 {
        return Err(ApiError::validation("area", "area must be greater than 0"));
    }

    for (field, value) in [
        ("rooms", payload.rooms),
        ("floor", payload.floor),
        ("totalFloors", payload.total_floors),
    ] {
        if let Some(count) = value {
            if count < 1 {
                return Err(ApiError::validation(field, "must be a positive integer"));
            }
        }
    }

    if payload.city.trim().is_empty() || payload.city.chars().count() > 80 {
        return Err(ApiError::validation("city", "city must be 1 to 80 characters"));
    }

    if let Some(district) = &payload.district {
        if district.chars().count() > 80 {
            return Err(ApiError::validation(
                "district",
                "district must be at most 80 characters",
            ));
        }
    }

    if payload.address.trim().is_empty() || payload.address.chars().count() > 200 {
        return Err(ApiError::validation(
            "address",
            "address must be 1 to 200 characters",
        ));
    }

    if payload.images.len() > MAX_IMAGES {
        return Err(ApiError::validation("images", "at most 10 photos"));
    }
    if payload.images.iter().any(|image| !image.starts_with("data:")) {
        return Err(ApiError::validation("images", "photos must be data URIs"));
    }

    if let Some(phone) = payload.contact_phone.as_deref().filter(|p| !p.is_empty()) {
        if !phone_looks_valid(phone) {
            return Err(ApiError::validation(
                "contactPhone",
                "phone number looks invalid",
            ));
        }
    }

    if let Some(email) = payload.contact_email.as_deref().filter(|e| !e.is_empty()) {
        if !email_looks_valid(email) {
            return Err(ApiError::validation(
                "contactEmail",
                "email address looks invalid",
            ));
        }
    }

    Ok(())
}

/// Digits with the usual separators, 7 to 15 digits total.
fn phone_looks_valid(phone: &str) -> bool {
    if !phone
        .chars()
        .all(|ch| ch.is_ascii_digit() || matches!(ch, '+' | '-' | ' ' | '(' | ')'))
    {
        return false;
    }
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits)
}

fn email_looks_valid(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    // Domain needs an interior dot.
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use renthub_types::models::PropertyType;

    fn valid() -> CreateListingRequest {
        CreateListingRequest {
            title: "Квартира в центре".to_string(),
            content: "Светлая квартира рядом с парком".to_string(),
            price: 50_000,
            property_type: PropertyType::Apartment,
            area: 40.0,
            rooms: Some(2),
            floor: Some(3),
            total_floors: Some(9),
            city: "Москва".to_string(),
            district: None,
            address: "ул. Ленина, 1".to_string(),
            images: vec![],
            contact_phone: None,
            contact_email: None,
            show_contacts: false,
            is_public: false,
        }
    }

    fn offending_field(payload: &CreateListingRequest) -> String {
        match validate_listing(payload) {
            Err(ApiError::Validation { field, .. }) => field,
            other => panic!("expected a validation error, got {:?}", other.err()),
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(validate_listing(&valid()).is_ok());
    }

    #[test]
    fn zero_price_is_rejected_citing_price() {
        let mut payload = valid();
        payload.price = 0;
        assert_eq!(offending_field(&payload), "price");
    }

    #[test]
    fn short_title_and_content_are_rejected() {
        let mut payload = valid();
        payload.title = "А".to_string();
        assert_eq!(offending_field(&payload), "title");

        let mut payload = valid();
        payload.content = "коротко".to_string();
        assert_eq!(offending_field(&payload), "content");
    }

    #[test]
    fn area_must_be_positive() {
        let mut payload = valid();
        payload.area = 0.0;
        assert_eq!(offending_field(&payload), "area");
    }

    #[test]
    fn optional_counters_must_be_positive_when_present() {
        let mut payload = valid();
        payload.rooms = Some(0);
        assert_eq!(offending_field(&payload), "rooms");

        let mut payload = valid();
        payload.total_floors = Some(-1);
        assert_eq!(offending_field(&payload), "totalFloors");
    }

    #[test]
    fn image_ceiling_is_ten() {
        let mut payload = valid();
        payload.images = vec!["data:image/png;base64,AAAA".to_string(); 11];
        assert_eq!(offending_field(&payload), "images");

        payload.images.truncate(10);
        assert!(validate_listing(&payload).is_ok());
    }

    #[test]
    fn non_data_uri_images_are_rejected() {
        let mut payload = valid();
        payload.images = vec!["https://example.com/photo.jpg".to_string()];
        assert_eq!(offending_field(&payload), "images");
    }

    #[test]
    fn contact_shapes_are_checked() {
        let mut payload = valid();
        payload.contact_phone = Some("call me".to_string());
        assert_eq!(offending_field(&payload), "contactPhone");

        let mut payload = valid();
        payload.contact_phone = Some("+7 (900) 123-45-67".to_string());
        assert!(validate_listing(&payload).is_ok());

        let mut payload = valid();
        payload.contact_email = Some("not-an-email".to_string());
        assert_eq!(offending_field(&payload), "contactEmail");

        let mut payload = valid();
        payload.contact_email = Some("user@example.com".to_string());
        assert!(validate_listing(&payload).is_ok());
    }
}
