// src/titles.rs
//! Column titles and cell values the reimbursement sheet gives special meaning to.

pub const SEQUENCE: &str = "序号";
pub const PROGRESS: &str = "处理进度";

pub const SUBSEQUENCE_START: &str = "子序列开始";
pub const SUBSEQUENCE_END: &str = "子序列结束";

pub const WAIT_PREFIX: &str = "等待";

pub const LOGIN_WORK_ID: &str = "登录界面工号";
pub const LOGIN_PASSWORD: &str = "登录界面密码";
pub const LOGIN_BUTTON: &str = "登录按钮";

pub const RESERVATION_BUTTON: &str = "预约按钮";
pub const RESERVATION_VALUE: &str = "预约";
pub const ADD_CONTENT_BUTTON: &str = "添加内容按钮";
pub const ADD_CONTENT_VALUE: &str = "点击";
pub const ONLINE_RESERVATION_BUTTON: &str = "网上预约报账按钮";

pub const TRANSFER_WORK_ID_PREFIX: &str = "转卡信息工号";
pub const CARD_TAIL_PREFIX: &str = "卡号尾号";

pub const PRINT_TITLES: [&str; 3] = ["打印按钮", "打印操作", "打印确认单按钮"];

pub const SUBJECT: &str = "科目";
pub const AMOUNT: &str = "金额";
pub const PROVINCE: &str = "省份";

pub const PROJECT_NUMBER: &str = "报销项目号";
pub const PROJECT_NUMBER_FALLBACKS: [&str; 3] = ["报销项目号", "项目编号", "项目号"];
pub const AMOUNT_FALLBACKS: [&str; 3] = ["金额", "总金额", "个人金额"];
pub const UNKNOWN_PROJECT: &str = "未知项目";
pub const UNKNOWN_AMOUNT: &str = "0";

/// Co-traveler fields, entered in this order for every traveler slot.
pub const TRAVELER_NAME: &str = "姓名";
pub const TRAVELER_KIND: &str = "人员类型";
pub const TRAVELER_UNIT: &str = "单位";
pub const TRAVELER_TITLE: &str = "职称";
pub const TRAVELER_WORK_ID: &str = "工号";
pub const TRAVELER_FIELDS: [&str; 5] = [
    TRAVELER_NAME,
    TRAVELER_KIND,
    TRAVELER_UNIT,
    TRAVELER_TITLE,
    TRAVELER_WORK_ID,
];

pub const CARD_WORK_ID: &str = "差旅转卡工号";
pub const CARD_TAIL: &str = "差旅卡号尾号";
pub const CARD_AMOUNT: &str = "个人差旅金额";
pub const CARD_FIELDS: [&str; 3] = [CARD_WORK_ID, CARD_TAIL, CARD_AMOUNT];

/// Repeated-entity blocks hold at most this many entries.
pub const MAX_BLOCK_ENTRIES: usize = 6;

/// Itinerary fields inside a traveler block always target the first detail row.
pub const ITINERARY_SLOT: usize = 0;
