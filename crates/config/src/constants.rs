//! Domain constants: product lists, keyword tables, geography
//!
//! Keyword tables are matched as lowercase substrings. Empirically tuned
//! weights live in `settings` so they can be overridden per deployment.

/// Product names used to recognise pesticide categories in text
pub mod products {
    pub const HERBICIDES: &[&str] = &[
        "specticle", "tenacity", "monument", "certainty", "sedgehammer", "drive", "barricade",
        "dimension", "prodiamine", "pendimethalin", "acclaim", "revolver", "dismiss", "tribute",
        "tower", "katana", "kerb", "gallery", "surflan", "ronstar", "oryzalin", "poacure",
    ];

    pub const FUNGICIDES: &[&str] = &[
        "heritage", "lexicon", "xzemplar", "headway", "renown", "medallion", "interface",
        "tartan", "banner", "bayleton", "tourney", "compass", "honor", "posterity", "secure",
        "briskway", "velista", "concert", "daconil", "chipco", "subdue", "banol", "segway",
        "disarm", "finale", "3336",
    ];

    pub const INSECTICIDES: &[&str] = &[
        "acelepryn", "merit", "arena", "allectus", "meridian", "chlorpyrifos", "bifenthrin",
        "dylox", "sevin", "talstar",
    ];

    pub const PGRS: &[&str] = &["primo", "trimmit", "cutless", "anuew", "embark", "proxy"];
}

/// Keyword tables for detection and channel selection
pub mod keywords {
    pub const IRRIGATION: &[&str] = &[
        "irrigation", "sprinkler", "water", "valve", "pump", "controller", "et rate",
        "evapotranspiration", "wetting agent", "syringe",
    ];
    pub const EQUIPMENT: &[&str] = &[
        "mower", "mowing", "equipment", "reel", "bedknife", "roller", "sprayer", "calibrat",
        "nozzle", "spreader",
    ];
    pub const CULTURAL: &[&str] = &[
        "aerify", "aeration", "topdress", "seed", "overseed", "sod", "verticut", "dethatch",
        "rolling", "thatch",
    ];
    pub const FERTILIZER: &[&str] = &[
        "fertiliz", "nitrogen", "potassium", "phosphorus", "soil test", "npk", "lbs n",
        "lb n", "urea", "micronutrient", "iron sulfate", "lime", "soil ph", "ph level",
    ];
    pub const CHEMICAL: &[&str] = &[
        "fungicide", "herbicide", "insecticide", "pesticide", "spray", "product", "rate",
        "tank mix", "frac", "hrac", "irac", "active ingredient", "label",
    ];
    pub const DIAGNOSTIC: &[&str] = &[
        "what is wrong", "what's wrong", "whats wrong", "identify", "diagnos", "dying",
        "yellow spots", "brown spots", "dead spots", "patches", "symptoms", "what is this",
        "turning brown", "turning yellow", "thinning",
    ];
    pub const DISEASE: &[&str] = &[
        "disease", "dollar spot", "brown patch", "pythium", "anthracnose", "fairy ring",
        "summer patch", "fusarium", "snow mold", "leaf spot", "take-all", "spring dead spot",
        "gray leaf spot", "red thread", "pink patch", "microdochium", "typhula", "rust",
        "large patch", "necrotic ring spot", "pink snow mold",
    ];
    pub const NEMATODE: &[&str] = &["nematode", "nematicide"];
    pub const ABIOTIC: &[&str] = &[
        "winterkill", "winter kill", "desiccation", "cold injury", "ice damage", "heat stress",
        "drought stress", "salt damage", "salinity", "scalping", "shade stress", "compaction",
        "black layer", "localized dry spot", "hydrophobic", "dog urine", "fertilizer burn",
    ];
    pub const TIMING: &[&str] = &["when", "timing", "schedule", "program", "month"];
    pub const ALGAE: &[&str] = &["algae", "moss", "slime"];
    pub const PRODUCT: &[&str] = &[
        "spray", "apply", "fungicide", "herbicide", "insecticide", "control", "treat",
        "product",
    ];
    pub const WATER: &[&str] = &["drought", "water", "irrigation", "conservation", "moisture"];

    /// Disease vocabulary that implies a fungicide need
    pub const DISEASE_NEED: &[&str] = &[
        "dollar spot", "brown patch", "pythium", "anthracnose", "fairy ring", "summer patch",
        "fusarium", "snow mold", "rust", "leaf spot", "take-all", "spring dead spot", "disease",
        "fungicide", "gray leaf spot", "red thread", "pink patch", "microdochium", "typhula",
        "algae", "moss",
    ];
    pub const WEED_NEED: &[&str] = &[
        "weed", "crabgrass", "poa", "goosegrass", "sedge", "clover", "dandelion", "herbicide",
        "pre-emergent", "post-emergent",
    ];
    pub const INSECT_NEED: &[&str] = &[
        "grub", "armyworm", "cutworm", "billbug", "mole cricket", "chinch bug", "insect",
        "insecticide", "pest",
    ];
    pub const PGR_NEED: &[&str] = &["growth", "pgr", "primo", "reduce mowing", "plant growth regulator"];

    /// Text that signals the wrong product category for a given need
    pub const WRONG_TYPE_FOR_FUNGICIDE: &[&str] =
        &["herbicide", "pre-emergent", "post-emergent", "weed control"];
    pub const WRONG_TYPE_FOR_HERBICIDE: &[&str] = &["disease control"];
    pub const WRONG_TYPE_FOR_INSECTICIDE: &[&str] = &["disease control", "weed control"];
}

/// Source-name patterns that move scores
pub mod sources {
    pub const LOW_QUALITY: &[&str] =
        &["hydroseeding", "small pack", "info sheet", "general", "catalog", "brochure"];
    pub const HIGH_VALUE_FUNGICIDE: &[&str] =
        &["chemical control", "turfgrass disease", "ppa1", "kentucky"];
    /// Disease/weed names that earn a source-name boost when in both question and source
    pub const PROBLEM_TERMS: &[&str] = &["dollar spot", "brown patch", "crabgrass", "poa", "pythium"];

    /// Labels, regulators and university extension (name, type or URL)
    pub const AUTHORITATIVE: &[&str] = &[
        "label", "sds", "msds", "specimen", "epa", ".edu", "extension", "university", "usga",
        "gcsaa", "ntep", "ifas", "ipm", "agcenter", "turffiles",
    ];
    /// Manufacturer technical documents and curated guides (name or type)
    pub const REPUTABLE: &[&str] = &[
        "bayer", "syngenta", "basf", "corteva", "nufarm", "pbi gordon", "fmc", "envu",
        "quali-pro", "primesource", "solution sheet", "technical bulletin", "tech sheet",
        "greencast", "nc state", "penn state", "disease_guide", "weed_guide", "pest_guide",
        "nematode_guide", "abiotic",
    ];

    /// (name, url) shown when no retrieved source is displayable
    pub const DEFAULT_SOURCES: &[(&str, &str)] = &[
        ("USGA Green Section", "https://www.usga.org/course-care.html"),
        ("GCSAA Resources", "https://www.gcsaa.org/"),
        ("Purdue Turfgrass Science", "https://turf.purdue.edu/"),
        ("Rutgers Turfgrass", "https://njaes.rutgers.edu/turf/"),
    ];
}

pub mod geography {
    pub const US_STATES: &[&str] = &[
        "alabama", "alaska", "arizona", "arkansas", "california", "colorado", "connecticut",
        "delaware", "florida", "georgia", "hawaii", "idaho", "illinois", "indiana", "iowa",
        "kansas", "kentucky", "louisiana", "maine", "maryland", "massachusetts", "michigan",
        "minnesota", "mississippi", "missouri", "montana", "nebraska", "nevada",
        "new hampshire", "new jersey", "new mexico", "new york", "north carolina",
        "north dakota", "ohio", "oklahoma", "oregon", "pennsylvania", "rhode island",
        "south carolina", "south dakota", "tennessee", "texas", "utah", "vermont", "virginia",
        "washington", "west virginia", "wisconsin", "wyoming",
    ];

    pub const NORTHEAST: &[&str] = &[
        "massachusetts", "connecticut", "rhode island", "vermont", "new hampshire", "maine",
        "new york", "pennsylvania", "new jersey",
    ];
    pub const SOUTHEAST: &[&str] = &[
        "florida", "georgia", "alabama", "south carolina", "north carolina", "virginia",
        "tennessee",
    ];
    pub const MIDWEST: &[&str] = &[
        "illinois", "indiana", "ohio", "michigan", "wisconsin", "minnesota", "iowa",
    ];
    pub const SOUTHWEST: &[&str] = &["texas", "oklahoma", "arizona", "new mexico"];
    /// Postal codes recognised in upper case. IN, OR, ME, OK and HI are
    /// left out because they collide with ordinary words.
    pub const STATE_CODES: &[(&str, &str)] = &[
        ("AL", "alabama"), ("AK", "alaska"), ("AZ", "arizona"), ("AR", "arkansas"),
        ("CA", "california"), ("CO", "colorado"), ("CT", "connecticut"), ("DE", "delaware"),
        ("FL", "florida"), ("GA", "georgia"), ("ID", "idaho"), ("IL", "illinois"),
        ("IA", "iowa"), ("KS", "kansas"), ("KY", "kentucky"), ("LA", "louisiana"),
        ("MD", "maryland"), ("MA", "massachusetts"), ("MI", "michigan"), ("MN", "minnesota"),
        ("MS", "mississippi"), ("MO", "missouri"), ("MT", "montana"), ("NE", "nebraska"),
        ("NV", "nevada"), ("NH", "new hampshire"), ("NJ", "new jersey"), ("NM", "new mexico"),
        ("NY", "new york"), ("NC", "north carolina"), ("ND", "north dakota"), ("PA", "pennsylvania"),
        ("RI", "rhode island"), ("SC", "south carolina"), ("SD", "south dakota"),
        ("TN", "tennessee"), ("TX", "texas"), ("UT", "utah"), ("VT", "vermont"),
        ("VA", "virginia"), ("WA", "washington"), ("WV", "west virginia"), ("WI", "wisconsin"),
        ("WY", "wyoming"),
    ];

    pub const WEST: &[&str] = &["california", "oregon", "washington", "nevada", "colorado"];
}

/// Grass vocabulary, in detection priority order
pub mod grasses {
    pub const BENTGRASS: &[&str] = &["bentgrass", "bent grass", "agrostis", "creeping bent"];
    pub const BERMUDAGRASS: &[&str] = &["bermudagrass", "bermuda", "cynodon"];
    pub const POA_ANNUA: &[&str] = &["poa", "poa annua", "annual bluegrass"];
    pub const KENTUCKY_BLUEGRASS: &[&str] = &["kentucky bluegrass", "kbg", "poa pratensis"];
    pub const TALL_FESCUE: &[&str] = &["tall fescue", "fescue"];
    pub const PERENNIAL_RYEGRASS: &[&str] = &["perennial ryegrass", "ryegrass", "rye grass"];
    pub const ZOYSIAGRASS: &[&str] = &["zoysiagrass", "zoysia"];

    /// Names checked by the wrong-grass penalty
    pub const SCORED: &[&str] = &[
        "bentgrass", "bermudagrass", "poa annua", "kentucky bluegrass", "zoysiagrass",
    ];
}

/// Text limits
pub mod limits {
    pub const MAX_QUESTION_CHARS: usize = 2000;
    pub const MAX_CHUNK_CHARS: usize = 1200;
    pub const MAX_CONTEXT_CHARS: usize = 32_000;
    pub const MAX_SOURCES: usize = 12;
    pub const HISTORY_TURNS: usize = 6;
    pub const HISTORY_ASSISTANT_CHARS: usize = 500;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_lists_lowercase() {
        for list in [
            products::HERBICIDES,
            products::FUNGICIDES,
            products::INSECTICIDES,
            products::PGRS,
        ] {
            assert!(list.iter().all(|p| p.to_lowercase() == *p));
        }
    }

    #[test]
    fn test_regions_are_states() {
        for region in [
            geography::NORTHEAST,
            geography::SOUTHEAST,
            geography::MIDWEST,
            geography::SOUTHWEST,
            geography::WEST,
        ] {
            assert!(region.iter().all(|s| geography::US_STATES.contains(s)));
        }
    }

    #[test]
    fn test_state_codes_name_states() {
        assert!(geography::STATE_CODES
            .iter()
            .all(|(code, name)| code.len() == 2 && geography::US_STATES.contains(name)));
    }
}
