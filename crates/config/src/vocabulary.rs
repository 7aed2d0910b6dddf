//! Search vocabulary: synonym expansions and stop words
//!
//! `SYNONYMS` is ordered and scanned front to back.

/// (term, expansion) pairs appended to queries that mention `term`
pub const SYNONYMS: &[(&str, &str)] = &[
    ("heritage", "heritage fungicide azoxystrobin strobilurin QoI FRAC11"),
    ("lexicon", "lexicon intrinsic fluxapyroxad pyraclostrobin SDHI"),
    ("xzemplar", "xzemplar fungicide fluxapyroxad SDHI FRAC7"),
    ("dedicate", "dedicate stressgard azoxystrobin fungicide"),
    ("headway", "headway azoxystrobin propiconazole DMI strobilurin"),
    ("banner maxx", "banner maxx propiconazole DMI FRAC3"),
    ("daconil", "daconil chlorothalonil contact fungicide FRACM5"),
    ("medallion", "medallion fludioxonil phenylpyrrole FRAC12"),
    ("secure", "secure fluazinam contact fungicide"),
    ("velista", "velista penthiopyrad SDHI FRAC7"),
    ("posterity", "posterity pydiflumetofen SDHI"),
    ("briskway", "briskway azoxystrobin difenoconazole"),
    ("insignia", "insignia pyraclostrobin strobilurin"),
    ("tartan", "tartan trifloxystrobin triadimefon"),
    ("tourney", "tourney metconazole DMI FRAC3"),
    ("maxtima", "maxtima mefentrifluconazole DMI"),
    ("tenacity", "tenacity herbicide mesotrione HPPD whitening"),
    ("drive", "drive xlr8 herbicide quinclorac crabgrass"),
    ("monument", "monument herbicide trifloxysulfuron ALS"),
    ("revolver", "revolver foramsulfuron ALS herbicide"),
    ("barricade", "barricade prodiamine pre-emergent preemergent"),
    ("dimension", "dimension dithiopyr pre-emergent preemergent"),
    ("specticle", "specticle indaziflam pre-emergent preemergent"),
    ("certainty", "certainty sulfosulfuron ALS herbicide sedge"),
    ("sedgehammer", "sedgehammer halosulfuron nutsedge sedge"),
    ("dismiss", "dismiss sulfentrazone sedge broadleaf"),
    ("speedzone", "speedzone carfentrazone 2,4-D broadleaf"),
    ("quicksilver", "quicksilver carfentrazone burndown"),
    ("pylex", "pylex topramezone HPPD bermuda"),
    ("primo", "primo maxx trinexapac-ethyl PGR plant growth regulator"),
    ("trimmit", "trimmit paclobutrazol PGR growth regulator"),
    ("cutless", "cutless flurprimidol PGR growth regulator"),
    ("anuew", "anuew prohexadione calcium PGR"),
    ("proxy", "proxy ethephon PGR seedhead suppression"),
    ("acelepryn", "acelepryn chlorantraniliprole grub preventive diamide"),
    ("merit", "merit imidacloprid neonicotinoid grub systemic"),
    ("arena", "arena clothianidin neonicotinoid"),
    ("dylox", "dylox trichlorfon grub curative fast-acting"),
    ("talstar", "talstar bifenthrin pyrethroid surface"),
    ("dollar spot", "dollar spot sclerotinia homoeocarpa clarireedia jacksonii"),
    ("brown patch", "brown patch rhizoctonia solani large patch"),
    ("pythium", "pythium blight cottony blight grease spot"),
    ("anthracnose", "anthracnose colletotrichum cereale basal rot foliar"),
    ("fairy ring", "fairy ring basidiomycete mushroom hydrophobic"),
    ("summer patch", "summer patch magnaporthiopsis poae necrotic ring"),
    ("take-all", "take-all patch gaeumannomyces graminis"),
    ("gray leaf spot", "gray leaf spot pyricularia grisea magnaporthe"),
    ("snow mold", "snow mold pink gray microdochium typhula"),
    ("spring dead spot", "spring dead spot ophiosphaerella bermuda"),
    ("red thread", "red thread laetisaria fuciformis pink patch"),
    ("rust", "rust puccinia crown leaf stem"),
    ("leaf spot", "leaf spot helminthosporium bipolaris drechslera"),
    ("necrotic ring", "necrotic ring spot ophiosphaerella korrae"),
    ("crabgrass", "crabgrass digitaria smooth hairy annual grass"),
    ("goosegrass", "goosegrass eleusine indica annual grass"),
    ("poa", "poa annua annual bluegrass winter annual"),
    ("poa annua", "poa annua annual bluegrass winter annual triv"),
    ("nutsedge", "nutsedge yellow purple cyperus sedge"),
    ("clover", "clover white trifolium repens broadleaf"),
    ("dandelion", "dandelion taraxacum broadleaf perennial"),
    ("ground ivy", "ground ivy creeping charlie glechoma broadleaf"),
    ("spurge", "spurge euphorbia spotted prostrate broadleaf"),
    ("knotweed", "knotweed prostrate polygonum broadleaf"),
    ("plantain", "plantain broadleaf buckhorn perennial"),
    ("bentgrass", "creeping bentgrass agrostis stolonifera velvet colonial"),
    ("bermudagrass", "bermudagrass bermuda cynodon dactylon hybrid common"),
    ("zoysiagrass", "zoysiagrass zoysia japonica matrella"),
    ("bluegrass", "kentucky bluegrass poa pratensis KBG cool-season"),
    ("ryegrass", "perennial ryegrass lolium perenne PRG"),
    ("fescue", "tall fescue fine fescue festuca arundinacea"),
    ("paspalum", "seashore paspalum paspalum vaginatum salt-tolerant"),
    ("st augustine", "st augustinegrass stenotaphrum secundatum"),
    ("centipede", "centipedegrass eremochloa ophiuroides"),
    ("bahia", "bahiagrass paspalum notatum"),
    ("aerify", "aerification aeration core hollow tine solid"),
    ("topdress", "topdressing sand application dressing"),
    ("overseed", "overseeding interseeding renovation"),
    ("verticut", "verticutting vertical mowing dethatching"),
    ("syringe", "syringing light watering cooling"),
    ("scalp", "scalping low mow renovation"),
    ("reel mower", "reel mower cylinder mower bedknife"),
    ("rotary mower", "rotary mower deck blade"),
    ("sprayer", "sprayer boom nozzle calibration GPM"),
    ("spreader", "spreader broadcast drop spinner"),
    ("roller", "roller lightweight vibratory smoothing"),
    ("rate", "application rate dosage amount per 1000 sq ft per acre oz fl"),
    ("tank mix", "tank mixing compatibility co-apply combination"),
    ("grub", "grubs white grubs scarab beetle larvae japanese chafer"),
    ("worm", "cutworm armyworm sod webworm caterpillar"),
    ("mite", "mites eriophyid bermudagrass mite"),
    ("nematode", "nematodes sting lance root-knot"),
    ("thatch", "thatch layer organic matter decomposition"),
    ("compaction", "compaction soil hardpan traffic"),
    ("drought", "drought stress wilt dry LDS localized dry spot"),
    ("heat stress", "heat stress summer decline high temperature"),
    ("winter kill", "winterkill winter injury cold damage desiccation"),
    ("salt", "salinity sodium chloride effluent reclaimed"),
    ("ph", "pH acidity alkalinity lime sulfur"),
    ("nitrogen", "nitrogen N fertility fertilizer urea ammonium"),
    ("iron", "iron Fe chlorosis yellowing micronutrient"),
    ("potassium", "potassium K stress tolerance"),
];

/// Words ignored by keyword scoring
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "must", "shall", "can", "need",
    "dare", "what", "how", "when", "where", "why", "which", "who", "whom", "this", "that",
    "these", "those", "am", "if", "then", "else", "so", "than", "too", "very", "just", "about",
    "into", "through", "during", "before", "after", "above", "below", "between", "under",
    "again", "further", "once", "here", "there", "all", "each", "few", "more", "most", "other",
    "some", "such", "no", "nor", "not", "only", "own", "same", "also", "any", "both", "i", "me",
    "my", "myself", "we", "our", "ours", "you", "your", "yours", "he", "him", "his", "she",
    "her", "hers", "it", "its", "they", "them", "their", "theirs", "turf", "grass", "lawn",
    "green", "fairway", "course", "golf", "please", "help", "thanks", "thank", "want", "like",
    "get", "use", "using", "used", "best", "good", "recommend",
];

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// First synonym term contained in `text`
pub fn first_synonym_in(text: &str) -> Option<&'static str> {
    SYNONYMS
        .iter()
        .find(|(term, _)| text.contains(term))
        .map(|(term, _)| *term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_words() {
        assert!(is_stop_word("the"));
        assert!(is_stop_word("turf"));
        assert!(!is_stop_word("heritage"));
    }

    #[test]
    fn test_first_synonym() {
        assert_eq!(first_synonym_in("heritage rate on greens"), Some("heritage"));
        assert_eq!(first_synonym_in("nothing here"), None);
    }

    #[test]
    fn test_synonym_terms_lowercase() {
        assert!(SYNONYMS.iter().all(|(t, _)| t.to_lowercase() == *t));
    }
}
