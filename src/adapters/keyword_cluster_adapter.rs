//! Issuer-name keyword taxonomy.
//!
//! A holding belongs to the first cluster, in declaration order, with a
//! keyword contained in its upper-cased issuer name.

use crate::ports::cluster_port::ClusterLookup;

const DEFAULT_TAXONOMY: &[(&str, &[&str])] = &[
    (
        "AI/Semiconductors",
        &[
            "NVIDIA", "AMD", "ADVANCED MICRO", "INTEL", "ASML", "TSMC", "TAIWAN SEMI",
            "SEMICONDUCTOR", "BROADCOM", "QUALCOMM", "MARVELL", "MICRON", "APPLIED MATERIAL",
            "LAM RESEARCH", "KLA", "SYNOPSYS", "CADENCE", "ARM HOLDINGS", "LATTICE",
        ],
    ),
    (
        "Cloud/SaaS",
        &[
            "SALESFORCE", "SERVICENOW", "WORKDAY", "SNOWFLAKE", "DATADOG", "MONGODB",
            "CLOUDFLARE", "ATLASSIAN", "HUBSPOT", "ZSCALER", "CROWDSTRIKE", "OKTA", "SPLUNK",
            "TWILIO", "DOCUSIGN", "ZOOM", "DROPBOX", "BOX INC",
        ],
    ),
    (
        "Fintech/Payments",
        &[
            "VISA", "MASTERCARD", "PAYPAL", "SQUARE", "BLOCK INC", "STRIPE", "ADYEN", "AFFIRM",
            "SOFI", "ROBINHOOD", "COINBASE", "MARQETA", "TOAST", "BILL.COM", "BILL HOLDINGS",
        ],
    ),
    (
        "E-commerce/Retail",
        &[
            "AMAZON", "SHOPIFY", "MERCADOLIBRE", "ETSY", "EBAY", "WAYFAIR", "CHEWY", "COUPANG",
            "PINDUODUO", "JD.COM", "ALIBABA", "WALMART", "TARGET", "COSTCO", "HOME DEPOT",
            "LOWE",
        ],
    ),
    (
        "Social/Advertising",
        &[
            "META", "FACEBOOK", "GOOGLE", "ALPHABET", "SNAP", "PINTEREST", "TWITTER",
            "LINKEDIN", "REDDIT", "TRADE DESK", "PUBMATIC", "DIGITAL TURBINE",
        ],
    ),
    (
        "Streaming/Media",
        &[
            "NETFLIX", "SPOTIFY", "DISNEY", "WARNER", "PARAMOUNT", "ROKU", "ROBLOX", "UNITY",
            "TAKE-TWO", "ELECTRONIC ARTS", "ACTIVISION", "LIVE NATION", "IMAX",
        ],
    ),
    (
        "Healthcare/Biotech",
        &[
            "UNITEDHEALTH", "CVS", "HUMANA", "CIGNA", "ANTHEM", "ELEVANCE", "PFIZER", "LILLY",
            "MERCK", "JOHNSON & JOHNSON", "ABBVIE", "AMGEN", "GILEAD", "REGENERON", "MODERNA",
            "BIONTECH", "VERTEX", "ILLUMINA", "DEXCOM", "INTUITIVE SURGICAL", "THERMO FISHER",
            "DANAHER", "ABBOTT",
        ],
    ),
    (
        "Energy",
        &[
            "EXXON", "CHEVRON", "MARATHON", "OCCIDENTAL", "CONOCOPHILLIPS", "SCHLUMBERGER",
            "HALLIBURTON", "PIONEER", "DEVON", "EOG", "DIAMONDBACK", "COTERRA", "HESS",
            "VALERO", "PHILLIPS 66",
        ],
    ),
    (
        "Clean Energy",
        &[
            "TESLA", "RIVIAN", "LUCID", "ENPHASE", "SOLAREDGE", "FIRST SOLAR", "SUNRUN",
            "PLUG POWER", "BLOOM ENERGY", "CHARGEPOINT", "EVGO", "NEXTERA",
        ],
    ),
    (
        "Financials/Banks",
        &[
            "JPMORGAN", "JP MORGAN", "BANK OF AMERICA", "WELLS FARGO", "CITIGROUP", "GOLDMAN",
            "MORGAN STANLEY", "CHARLES SCHWAB", "BLACKROCK", "BLACKSTONE", "KKR", "APOLLO",
            "CARLYLE", "STATE STREET", "NORTHERN TRUST", "BANK OF NEW YORK", "US BANCORP",
            "PNC", "TRUIST", "CAPITAL ONE", "AMERICAN EXPRESS", "DISCOVER", "SYNCHRONY",
        ],
    ),
    (
        "Industrials",
        &[
            "CATERPILLAR", "DEERE", "BOEING", "LOCKHEED", "RAYTHEON", "RTX", "NORTHROP",
            "GENERAL DYNAMICS", "L3HARRIS", "HONEYWELL", "3M", "GENERAL ELECTRIC",
            "UNION PACIFIC", "CSX", "NORFOLK", "FEDEX", "UPS", "UNITED PARCEL",
        ],
    ),
    (
        "Consumer",
        &[
            "COCA-COLA", "PEPSI", "PROCTER", "P&G", "UNILEVER", "COLGATE", "KIMBERLY", "CLOROX",
            "ESTEE LAUDER", "NIKE", "LULULEMON", "STARBUCKS", "MCDONALD", "CHIPOTLE", "YUM",
            "DOMINO",
        ],
    ),
    (
        "Telecom",
        &["AT&T", "VERIZON", "T-MOBILE", "COMCAST", "CHARTER", "DISH", "LUMEN", "VONAGE"],
    ),
    (
        "Real Estate",
        &[
            "PROLOGIS", "AMERICAN TOWER", "CROWN CASTLE", "EQUINIX", "DIGITAL REALTY",
            "PUBLIC STORAGE", "REALTY INCOME", "SIMON PROPERTY", "WELLTOWER", "VENTAS",
            "AVALONBAY", "EQUITY RESIDENTIAL",
        ],
    ),
];

pub struct KeywordClusterAdapter {
    clusters: Vec<(String, Vec<String>)>,
}

impl KeywordClusterAdapter {
    /// Clusters in match priority order. Keywords are upper-cased.
    pub fn new(clusters: Vec<(String, Vec<String>)>) -> Self {
        let clusters = clusters
            .into_iter()
            .map(|(label, keywords)| {
                (label, keywords.into_iter().map(|k| k.to_uppercase()).collect())
            })
            .collect();
        Self { clusters }
    }

    pub fn cluster_labels(&self) -> impl Iterator<Item = &str> {
        self.clusters.iter().map(|(label, _)| label.as_str())
    }
}

impl Default for KeywordClusterAdapter {
    fn default() -> Self {
        Self::new(
            DEFAULT_TAXONOMY
                .iter()
                .map(|(label, keywords)| {
                    (
                        label.to_string(),
                        keywords.iter().map(|k| k.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }
}

impl ClusterLookup for KeywordClusterAdapter {
    fn label_for(&self, _identifier: &str, issuer_label: &str) -> Option<String> {
        let name = issuer_label.to_uppercase();
        self.clusters
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k.as_str())))
            .map(|(label, _)| label.clone())
    }
}
