//! Small COMTRADE pairs shared by the reader and channel tests.

/// Three analog channels (PSCAD-style ids) and one digital, five samples.
pub const PSCAD_CFG: &str = "\
IBR,PSCAD,1999
4,3A,1D
1,VA:Solar2,A,,kV,0.01,0.0,0,-32767,32767,1,1,P
2,IA:Solar2,A,,kA,0.001,0.0,0,-32767,32767,10,1,s
3,F,,,Hz,1,0,0,0,0
1,BRK,,,0
60
1
1000,5
01/07/2023,10:15:30.000000
01/07/2023,10:15:30.250000
ASCII
1
";

pub const PSCAD_DAT: &str = "\
1,0,100,200,60.0,0
2,1000,200,400,60.1,0
3,2000,300,99999,60.2,1
4,3000,400,800,60.1,1
5,4000,500,1000,60.0,0
";

/// Labels of a plant record as PSCAD names them, with units.
pub const STANDARD_CHANNELS: [(&str, &str); 10] = [
    ("VA:Plant", "kV"),
    ("VB:Plant", "kV"),
    ("VC:Plant", "kV"),
    ("IA:Plant", "kA"),
    ("IB:Plant", "kA"),
    ("IC:Plant", "kA"),
    ("Vrms:Plant", "kV"),
    ("P:Plant", "MW"),
    ("Q:Plant", "MVAR"),
    ("F:Plant", "Hz"),
];

/// ASCII pair with the ten standard channels sampled at `rate_hz`. Every
/// channel holds `channel_index + 1` except `F`, which holds 59.0.
pub fn standard_pair(samples: usize, rate_hz: f64) -> (String, String) {
    let mut cfg = String::from("Plant,emtplot,1999\n10,10A,0D\n");
    for (idx, (id, unit)) in STANDARD_CHANNELS.iter().enumerate() {
        cfg.push_str(&format!(
            "{},{id},,,{unit},1,0,0,-1e6,1e6,1,1,P\n",
            idx + 1
        ));
    }
    cfg.push_str(&format!(
        "60\n1\n{rate_hz},{samples}\n01/01/2024,00:00:00.000000\n01/01/2024,00:00:00.000000\nASCII\n1\n"
    ));
    let mut dat = String::new();
    for n in 1..=samples {
        dat.push_str(&format!("{n},0"));
        for idx in 0..STANDARD_CHANNELS.len() {
            let value = if idx == 9 { 59.0 } else { (idx + 1) as f64 };
            dat.push_str(&format!(",{value}"));
        }
        dat.push('\n');
    }
    (cfg, dat)
}
