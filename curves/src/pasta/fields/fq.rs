use ark_ff::{
    fields::{MontBackend, MontConfig},
    Fp256,
};

#[derive(MontConfig)]
#[modulus = "28948022309329048855892746252171976963363056481941647379679742748393362948097"]
#[generator = "5"]
pub struct FqParameters;

pub type Fq = Fp256<MontBackend<FqParameters, 4>>;
