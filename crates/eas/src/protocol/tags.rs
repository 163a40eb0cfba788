//! ActiveSync code pages
//!
//! Only the tags this client reads or writes are listed.

use super::wbxml::Tag;

pub mod airsync {
    use super::Tag;
    pub const PAGE: u8 = 0;

    pub const SYNC: Tag = Tag::new(PAGE, 0x05);
    pub const RESPONSES: Tag = Tag::new(PAGE, 0x06);
    pub const ADD: Tag = Tag::new(PAGE, 0x07);
    pub const CHANGE: Tag = Tag::new(PAGE, 0x08);
    pub const DELETE: Tag = Tag::new(PAGE, 0x09);
    pub const FETCH: Tag = Tag::new(PAGE, 0x0A);
    pub const SYNC_KEY: Tag = Tag::new(PAGE, 0x0B);
    pub const CLIENT_ID: Tag = Tag::new(PAGE, 0x0C);
    pub const SERVER_ID: Tag = Tag::new(PAGE, 0x0D);
    pub const STATUS: Tag = Tag::new(PAGE, 0x0E);
    pub const COLLECTION: Tag = Tag::new(PAGE, 0x0F);
    pub const CLASS: Tag = Tag::new(PAGE, 0x10);
    pub const COLLECTION_ID: Tag = Tag::new(PAGE, 0x12);
    pub const GET_CHANGES: Tag = Tag::new(PAGE, 0x13);
    pub const MORE_AVAILABLE: Tag = Tag::new(PAGE, 0x14);
    pub const WINDOW_SIZE: Tag = Tag::new(PAGE, 0x15);
    pub const COMMANDS: Tag = Tag::new(PAGE, 0x16);
    pub const OPTIONS: Tag = Tag::new(PAGE, 0x17);
    pub const FILTER_TYPE: Tag = Tag::new(PAGE, 0x18);
    pub const COLLECTIONS: Tag = Tag::new(PAGE, 0x1C);
    pub const APPLICATION_DATA: Tag = Tag::new(PAGE, 0x1D);
    pub const DELETES_AS_MOVES: Tag = Tag::new(PAGE, 0x1E);
    pub const SOFT_DELETE: Tag = Tag::new(PAGE, 0x21);
    pub const MIME_SUPPORT: Tag = Tag::new(PAGE, 0x22);
    pub const MIME_TRUNCATION: Tag = Tag::new(PAGE, 0x23);
}

pub mod email {
    use super::Tag;
    pub const PAGE: u8 = 2;

    pub const DATE_RECEIVED: Tag = Tag::new(PAGE, 0x0F);
    pub const MESSAGE_CLASS: Tag = Tag::new(PAGE, 0x13);
    pub const SUBJECT: Tag = Tag::new(PAGE, 0x14);
    pub const READ: Tag = Tag::new(PAGE, 0x15);
    pub const TO: Tag = Tag::new(PAGE, 0x16);
    pub const CC: Tag = Tag::new(PAGE, 0x17);
    pub const FROM: Tag = Tag::new(PAGE, 0x18);
    pub const REPLY_TO: Tag = Tag::new(PAGE, 0x19);
    pub const THREAD_TOPIC: Tag = Tag::new(PAGE, 0x35);
    pub const MIME_DATA: Tag = Tag::new(PAGE, 0x36);
    pub const MIME_TRUNCATED: Tag = Tag::new(PAGE, 0x37);
    pub const FLAG: Tag = Tag::new(PAGE, 0x3A);
    pub const FLAG_STATUS: Tag = Tag::new(PAGE, 0x3B);
    pub const FLAG_TYPE: Tag = Tag::new(PAGE, 0x3D);
}

pub mod moves {
    use super::Tag;
    pub const PAGE: u8 = 5;

    pub const MOVE_ITEMS: Tag = Tag::new(PAGE, 0x05);
    pub const MOVE: Tag = Tag::new(PAGE, 0x06);
    pub const SRC_MSG_ID: Tag = Tag::new(PAGE, 0x07);
    pub const SRC_FLD_ID: Tag = Tag::new(PAGE, 0x08);
    pub const DST_FLD_ID: Tag = Tag::new(PAGE, 0x09);
    pub const RESPONSE: Tag = Tag::new(PAGE, 0x0A);
    pub const STATUS: Tag = Tag::new(PAGE, 0x0B);
    pub const DST_MSG_ID: Tag = Tag::new(PAGE, 0x0C);
}

pub mod folder_hierarchy {
    use super::Tag;
    pub const PAGE: u8 = 7;

    pub const DISPLAY_NAME: Tag = Tag::new(PAGE, 0x07);
    pub const SERVER_ID: Tag = Tag::new(PAGE, 0x08);
    pub const PARENT_ID: Tag = Tag::new(PAGE, 0x09);
    pub const TYPE: Tag = Tag::new(PAGE, 0x0A);
    pub const STATUS: Tag = Tag::new(PAGE, 0x0C);
    pub const CHANGES: Tag = Tag::new(PAGE, 0x0E);
    pub const ADD: Tag = Tag::new(PAGE, 0x0F);
    pub const DELETE: Tag = Tag::new(PAGE, 0x10);
    pub const UPDATE: Tag = Tag::new(PAGE, 0x11);
    pub const SYNC_KEY: Tag = Tag::new(PAGE, 0x12);
    pub const FOLDER_SYNC: Tag = Tag::new(PAGE, 0x16);
    pub const COUNT: Tag = Tag::new(PAGE, 0x17);
}

pub mod provision {
    use super::Tag;
    pub const PAGE: u8 = 14;

    pub const PROVISION: Tag = Tag::new(PAGE, 0x05);
    pub const POLICIES: Tag = Tag::new(PAGE, 0x06);
    pub const POLICY: Tag = Tag::new(PAGE, 0x07);
    pub const POLICY_TYPE: Tag = Tag::new(PAGE, 0x08);
    pub const POLICY_KEY: Tag = Tag::new(PAGE, 0x09);
    pub const DATA: Tag = Tag::new(PAGE, 0x0A);
    pub const STATUS: Tag = Tag::new(PAGE, 0x0B);
    pub const REMOTE_WIPE: Tag = Tag::new(PAGE, 0x0C);
}

pub mod airsync_base {
    use super::Tag;
    pub const PAGE: u8 = 17;

    pub const BODY_PREFERENCE: Tag = Tag::new(PAGE, 0x05);
    pub const TYPE: Tag = Tag::new(PAGE, 0x06);
    pub const TRUNCATION_SIZE: Tag = Tag::new(PAGE, 0x07);
    pub const BODY: Tag = Tag::new(PAGE, 0x0A);
    pub const DATA: Tag = Tag::new(PAGE, 0x0B);
    pub const ESTIMATED_DATA_SIZE: Tag = Tag::new(PAGE, 0x0C);
    pub const TRUNCATED: Tag = Tag::new(PAGE, 0x0D);
}

pub mod compose_mail {
    use super::Tag;
    pub const PAGE: u8 = 21;

    pub const SEND_MAIL: Tag = Tag::new(PAGE, 0x05);
    pub const SAVE_IN_SENT_ITEMS: Tag = Tag::new(PAGE, 0x08);
    pub const MIME: Tag = Tag::new(PAGE, 0x10);
    pub const CLIENT_ID: Tag = Tag::new(PAGE, 0x11);
    pub const STATUS: Tag = Tag::new(PAGE, 0x12);
}

pub mod email2 {
    use super::Tag;
    pub const PAGE: u8 = 22;

    pub const CONVERSATION_ID: Tag = Tag::new(PAGE, 0x09);
    pub const LAST_VERB_EXECUTED: Tag = Tag::new(PAGE, 0x0B);
}
