use crate::constants::BARTER_PRICE;
use crate::normalize::contains_token;
use crate::types::{AdDraft, AdStatus, NormalizedAd};
use sha2::{Digest, Sha256};

/// SHA-256 hex digest of `text`.
pub fn hash_identity(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Applies the derived-field pass and freezes the record.
///
/// Barter offers override the text status, the id is the digest of the URL, and the
/// token flag records whether the title mentions the searched label.
pub fn finalize(draft: AdDraft) -> NormalizedAd {
    let status = if draft.price == BARTER_PRICE {
        AdStatus::ExchangeOffer
    } else {
        draft.status
    };
    let title_contains_label_token = contains_token(&draft.title, &draft.label);

    NormalizedAd {
        ad_id: hash_identity(&draft.url),
        title: draft.title,
        price: draft.price,
        status,
        city: draft.city,
        district: draft.district,
        published: draft.published,
        label: draft.label,
        category: draft.category,
        url: draft.url,
        scraped_timestamp: draft.captured.at,
        scraped_date: draft.captured.date(),
        title_contains_label_token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CaptureTime;
    use chrono::{TimeZone, Utc};

    fn draft(title: &str, price: f64, status: AdStatus) -> AdDraft {
        AdDraft {
            title: title.to_string(),
            price,
            status,
            city: "Poznań".to_string(),
            district: None,
            published: None,
            url: "https://www.olx.pl/d/oferta/kemet-CID88-IDabc.html".to_string(),
            label: "kemet".to_string(),
            category: "board_games".to_string(),
            captured: CaptureTime::at(Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap()),
        }
    }

    #[test]
    fn hash_is_stable_sha256_hex() {
        assert_eq!(
            hash_identity("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let url = "https://www.olx.pl/d/oferta/kemet-CID88-IDabc.html";
        assert_eq!(hash_identity(url), hash_identity(url));
        assert_ne!(hash_identity(url), hash_identity(&url.replace("abc", "abd")));
    }

    #[test]
    fn barter_price_forces_exchange_status() {
        let ad = finalize(draft("Kemet wymiana", 9999.0, AdStatus::Used));
        assert_eq!(ad.status, AdStatus::ExchangeOffer);

        let ad = finalize(draft("Kemet", 150.0, AdStatus::Used));
        assert_eq!(ad.status, AdStatus::Used);
    }

    #[test]
    fn derived_fields_are_filled() {
        let ad = finalize(draft("KEMET: Krew i Piasek", 150.0, AdStatus::New));
        assert!(ad.title_contains_label_token);
        assert_eq!(ad.ad_id, hash_identity(&ad.url));
        assert_eq!(ad.scraped_date.to_string(), "2024-05-15");

        let ad = finalize(draft("Cyklady", 150.0, AdStatus::New));
        assert!(!ad.title_contains_label_token);
    }
}
