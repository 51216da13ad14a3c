use ark_ff::{
    fields::{MontBackend, MontConfig},
    Fp256,
};

#[derive(MontConfig)]
#[modulus = "28948022309329048855892746252171976963363056481941560715954676764349967630337"]
#[generator = "5"]
pub struct FpParameters;

pub type Fp = Fp256<MontBackend<FpParameters, 4>>;
