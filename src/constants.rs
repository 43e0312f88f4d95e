/// Marketplace origin every relative listing link is resolved against
pub const OLX_BASE_ORIGIN: &str = "https://www.olx.pl";

/// Category names as they appear in the export table
pub const BOARD_GAMES_CATEGORY: &str = "board_games";
pub const BOARD_GAMES_URL: &str = "https://www.olx.pl/sport-hobby/gry-planszowe/q-";

/// Price text the marketplace shows for "will swap" offers instead of an amount
pub const BARTER_TOKEN: &str = "Zamienię";

/// Price recorded for barter offers
pub const BARTER_PRICE: f64 = 9999.0;

// Status labels rendered on listing cards
pub const STATUS_NEW_TOKEN: &str = "Nowe";
pub const STATUS_USED_TOKEN: &str = "Używane";

/// Query parameter the marketplace appends to ads pulled in from a broadened search
pub const EXTENDED_SEARCH_PARAM: &str = "reason";

/// Values of [`EXTENDED_SEARCH_PARAM`] that mark an ad as coming from outside the searched category
pub const EXTENDED_SEARCH_REASONS: &[&str] = &[
    "extended_search_extended_category",
    "extended_search_extended_s2v",
];

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_TABLE_ID: &str = "olx_ads";

/// Search terms crawled when the config file does not list its own
pub const DEFAULT_QUERIES: &[&str] = &[
    "7 cudów",
    "7 cudów świata pojedynek",
    "zwierzęcy front",
    "black orchestra",
    "blitzkrieg world war two in 20 minutes",
    "chaos w starym świecie",
    "chaos in the old world",
    "death may die",
    "cubitos",
    "cyklady",
    "bloody palace",
    "dune imperium",
    "diuna imperium",
    "fallout shelter",
    "fruit ninja",
    "gretchinz",
    "hannibal hamilcar",
    "homeworld fleet command",
    "kemet",
    "pan lodowego ogrodu",
    "metal gear solid",
    "katedra koszmarów",
    "pandemic legacy",
    "pandemic upadek rzymu",
    "pandemic cthulhu",
    "rising sun",
    "summoner wars",
    "twilight struggle",
    "wrath of the lich king",
    "xcom",
    "zona sekret czarnobyla",
];
