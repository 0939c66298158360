//! Built-in TLD → WHOIS server table with caller overrides.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Registry WHOIS hosts by TLD label, including A-label (`xn--`) forms.
/// Far from exhaustive; unlisted TLDs surface as "not supported" from the
/// default client and the heuristic assumes them registered.
const BUILTIN: &[(&str, &str)] = &[
    // Generic TLDs
    ("com", "whois.verisign-grs.com"),
    ("net", "whois.verisign-grs.com"),
    ("org", "whois.pir.org"),
    ("info", "whois.afilias.net"),
    ("biz", "whois.biz"),
    ("name", "whois.nic.name"),
    ("mobi", "whois.afilias.net"),
    ("aero", "whois.aero"),
    ("asia", "whois.nic.asia"),
    ("cat", "whois.nic.cat"),
    ("coop", "whois.nic.coop"),
    ("edu", "whois.educause.edu"),
    ("gov", "whois.dotgov.gov"),
    ("int", "whois.iana.org"),
    ("jobs", "whois.nic.jobs"),
    ("museum", "whois.museum"),
    ("tel", "whois.nic.tel"),
    ("travel", "whois.nic.travel"),
    // New gTLDs
    ("app", "whois.nic.google"),
    ("dev", "whois.nic.google"),
    ("page", "whois.nic.google"),
    ("blog", "whois.nic.blog"),
    ("cloud", "whois.nic.cloud"),
    ("xyz", "whois.nic.xyz"),
    ("online", "whois.nic.online"),
    ("site", "whois.nic.site"),
    ("tech", "whois.nic.tech"),
    ("store", "whois.nic.store"),
    ("shop", "whois.nic.shop"),
    ("world", "whois.nic.world"),
    ("email", "whois.nic.email"),
    ("digital", "whois.nic.digital"),
    ("network", "whois.nic.network"),
    ("agency", "whois.nic.agency"),
    ("company", "whois.nic.company"),
    ("solutions", "whois.nic.solutions"),
    ("systems", "whois.nic.systems"),
    ("services", "whois.nic.services"),
    ("studio", "whois.nic.studio"),
    ("design", "whois.nic.design"),
    ("media", "whois.nic.media"),
    ("software", "whois.nic.software"),
    ("technology", "whois.nic.technology"),
    ("live", "whois.nic.live"),
    ("news", "whois.nic.news"),
    ("today", "whois.nic.today"),
    ("life", "whois.nic.life"),
    // Popular two-letter registries operated as gTLD-alikes
    ("io", "whois.nic.io"),
    ("co", "whois.nic.co"),
    ("me", "whois.nic.me"),
    ("tv", "tvwhois.verisign-grs.com"),
    ("cc", "ccwhois.verisign-grs.com"),
    ("ai", "whois.nic.ai"),
    ("gg", "whois.gg"),
    ("sh", "whois.nic.sh"),
    ("ly", "whois.nic.ly"),
    ("to", "whois.tonic.to"),
    ("ws", "whois.website.ws"),
    // Country codes
    ("ac", "whois.nic.ac"),
    ("ar", "whois.nic.ar"),
    ("at", "whois.nic.at"),
    ("au", "whois.auda.org.au"),
    ("be", "whois.dns.be"),
    ("br", "whois.registro.br"),
    ("ca", "whois.cira.ca"),
    ("ch", "whois.nic.ch"),
    ("cl", "whois.nic.cl"),
    ("cn", "whois.cnnic.cn"),
    ("cz", "whois.nic.cz"),
    ("de", "whois.denic.de"),
    ("dk", "whois.punktum.dk"),
    ("ee", "whois.tld.ee"),
    ("es", "whois.nic.es"),
    ("eu", "whois.eu"),
    ("fi", "whois.fi"),
    ("fr", "whois.nic.fr"),
    ("hk", "whois.hkirc.hk"),
    ("hr", "whois.dns.hr"),
    ("hu", "whois.nic.hu"),
    ("id", "whois.id"),
    ("ie", "whois.weare.ie"),
    ("il", "whois.isoc.org.il"),
    ("in", "whois.registry.in"),
    ("ir", "whois.nic.ir"),
    ("is", "whois.isnic.is"),
    ("it", "whois.nic.it"),
    ("jp", "whois.jprs.jp"),
    ("kr", "whois.kr"),
    ("kz", "whois.nic.kz"),
    ("lt", "whois.domreg.lt"),
    ("lu", "whois.dns.lu"),
    ("lv", "whois.nic.lv"),
    ("mx", "whois.mx"),
    ("my", "whois.mynic.my"),
    ("nl", "whois.domain-registry.nl"),
    ("no", "whois.norid.no"),
    ("nu", "whois.iis.nu"),
    ("nz", "whois.irs.net.nz"),
    ("ph", "whois.nic.ph"),
    ("pl", "whois.dns.pl"),
    ("pt", "whois.dns.pt"),
    ("ro", "whois.rotld.ro"),
    ("rs", "whois.rnids.rs"),
    ("ru", "whois.tcinet.ru"),
    ("sa", "whois.nic.net.sa"),
    ("se", "whois.iis.se"),
    ("sg", "whois.sgnic.sg"),
    ("si", "whois.register.si"),
    ("sk", "whois.sk-nic.sk"),
    ("su", "whois.tcinet.ru"),
    ("th", "whois.thnic.co.th"),
    ("tr", "whois.trabis.gov.tr"),
    ("tw", "whois.twnic.net.tw"),
    ("ua", "whois.ua"),
    ("uk", "whois.nic.uk"),
    ("us", "whois.nic.us"),
    ("uy", "whois.nic.org.uy"),
    ("vn", "whois.nic.vn"),
    ("za", "whois.registry.net.za"),
    // Internationalized ccTLDs
    ("xn--p1ai", "whois.tcinet.ru"),          // .рф
    ("xn--fiqs8s", "cwhois.cnnic.cn"),        // .中国
    ("xn--fiqz9s", "cwhois.cnnic.cn"),        // .中國
    ("xn--j6w193g", "whois.hkirc.hk"),        // .香港
    ("xn--kpry57d", "whois.twnic.net.tw"),    // .台灣
    ("xn--kprw13d", "whois.twnic.net.tw"),    // .台湾
    ("xn--wgbl6a", "whois.registry.qa"),      // .قطر
    ("xn--90ais", "whois.cctld.by"),          // .бел
    ("xn--h2brj9c", "whois.registry.in"),     // .भारत
];

static BUILTIN_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| BUILTIN.iter().copied().collect());

/// TLD → WHOIS server hints: the built-in table merged beneath caller
/// entries. Immutable after construction and shared across all lookups of
/// a checker instance.
#[derive(Debug, Clone, Default)]
pub struct TldWhoisMap {
    overrides: HashMap<String, String>,
}

impl TldWhoisMap {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Caller entries win over the built-in table. Keys are stored
    /// lowercased so lookups can't miss on case.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        Self {
            overrides: overrides
                .iter()
                .map(|(tld, server)| (tld.to_lowercase(), server.clone()))
                .collect(),
        }
    }

    pub fn server_for(&self, tld: &str) -> Option<&str> {
        let tld = tld.to_lowercase();
        if let Some(server) = self.overrides.get(&tld) {
            return Some(server.as_str());
        }
        BUILTIN_MAP.get(tld.as_str()).copied()
    }
}
