//! Ready-made domain values and commands for tests.
//!
//! Every fixture describes the same "Hydrating Serum" product so tests can
//! mix them freely.

use chrono::{DateTime, TimeZone, Utc};
use offer_item_lifecycle::domain::assignee::Stage;
use offer_item_lifecycle::domain::commands::{
    AssigneeInput, DraftedItemInfoInput, QuestionnaireInput, SaveOfferItem, ScheduleInput,
};
use offer_item_lifecycle::domain::commission::{Commission, CommissionType};
use offer_item_lifecycle::domain::ids::{AmebaId, DfItemId, ItemId};
use offer_item_lifecycle::domain::item::{DfItem, Item};
use offer_item_lifecycle::domain::offer_item::{
    MailToggles, OfferTexts, PostTarget, SpecialCommission, WorkflowFlags,
};
use offer_item_lifecycle::domain::questionnaire::{QuestionInput, QuestionType};
use offer_item_lifecycle::domain::schedule::ScheduleType;
use uuid::Uuid;

pub const ITEM_ID: &str = "item-1";
pub const DF_ITEM_ID: &str = "df-1";

/// 10:00 UTC on the given day of January 2026.
///
/// # Panics
///
/// Panics if `day` is not a valid day of January.
#[must_use]
pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, day, 10, 0, 0).unwrap()
}

/// # Panics
///
/// Never; the commission is valid.
#[must_use]
pub fn fixed_rate(rate: f32) -> Commission {
    Commission::new(CommissionType::FixedRate, rate).unwrap()
}

/// The catalog entry for [`ITEM_ID`].
#[must_use]
pub fn catalog_item() -> Item {
    Item {
        image_url: "https://img.example/serum.png".into(),
        name: "Hydrating Serum".into(),
        min_commission: fixed_rate(5.0),
        max_commission: fixed_rate(8.0),
        content_name: "Acme Cosmetics".into(),
        ..Item::from_id(ItemId::new(ITEM_ID))
    }
}

/// The catalog entry for [`DF_ITEM_ID`].
#[must_use]
pub fn catalog_df_item() -> DfItem {
    DfItem {
        image_url: "https://img.example/serum-df.png".into(),
        name: "Hydrating Serum (DF)".into(),
        min_commission: fixed_rate(5.0),
        max_commission: fixed_rate(8.0),
        ..DfItem::from_id(DfItemId::new(DF_ITEM_ID))
    }
}

/// Invitation, article posting and payment windows without ids.
#[must_use]
pub fn required_schedule_inputs() -> Vec<ScheduleInput> {
    vec![
        ScheduleInput {
            id: None,
            schedule_type: ScheduleType::Invitation,
            start_date: Some(at(1)),
            end_date: Some(at(10)),
        },
        ScheduleInput {
            id: None,
            schedule_type: ScheduleType::ArticlePosting,
            start_date: Some(at(11)),
            end_date: Some(at(20)),
        },
        ScheduleInput {
            id: None,
            schedule_type: ScheduleType::Payment,
            start_date: None,
            end_date: Some(at(31)),
        },
    ]
}

#[must_use]
pub fn drafted_item_info_input() -> DraftedItemInfoInput {
    DraftedItemInfoInput {
        name: "Hydrating Serum".into(),
        content_name: "Acme Cosmetics".into(),
        image_url: "https://img.example/serum.png".into(),
        url: "https://shop.example/serum".into(),
        min_commission: fixed_rate(5.0),
        max_commission: fixed_rate(8.0),
    }
}

#[must_use]
pub fn offer_texts() -> OfferTexts {
    OfferTexts {
        product_features: "Lightweight serum with hyaluronic acid".into(),
        cautionary_points: "Do not mention competitor products".into(),
        reference_info: "https://shop.example/serum".into(),
        other_info: "Photos must show the bottle".into(),
    }
}

/// A campaign creation request with no assignees and no questionnaire.
#[must_use]
pub fn save_offer_item(flags: WorkflowFlags) -> SaveOfferItem {
    SaveOfferItem {
        correlation_id: Uuid::new_v4(),
        offer_item_id: None,
        name: "Spring serum campaign".into(),
        item_id: ItemId::new(ITEM_ID),
        df_item_id: None,
        has_coupon: false,
        coupon_banner_id: None,
        special_commission: SpecialCommission::default(),
        flags,
        post_target: PostTarget::Ameba,
        texts: offer_texts(),
        mail: MailToggles::default(),
        is_closed: false,
        schedules: required_schedule_inputs(),
        assignees: Vec::new(),
        questionnaire: None,
        drafted_item_info: drafted_item_info_input(),
    }
}

#[must_use]
pub fn assignee_input(ameba_id: &str, stage: Stage) -> AssigneeInput {
    AssigneeInput {
        ameba_id: AmebaId::new(ameba_id),
        stage,
        writing_fee: 3000,
        is_deleted: false,
    }
}

/// One radio question ("Skin type?": dry or oily) and one text question.
#[must_use]
pub fn questionnaire_input() -> QuestionnaireInput {
    QuestionnaireInput {
        description: "Tell us about your skin".into(),
        questions: vec![
            QuestionInput {
                id: None,
                question_type: QuestionType::Radio,
                title: "Skin type?".into(),
                image_url: String::new(),
                options: vec!["dry".into(), "oily".into()],
            },
            QuestionInput {
                id: None,
                question_type: QuestionType::Text,
                title: "Favorite product?".into(),
                image_url: String::new(),
                options: Vec::new(),
            },
        ],
    }
}
