//! r1cs gadgets shared by both circuits
//!
//! the poseidon gadget replays the circom permutation over the exact
//! parameter set the native hasher uses, so an in-circuit hash and a
//! `shade_core::poseidon` hash of the same inputs are the same field
//! element. the merkle gadget folds a padded lean-imt path and selects
//! the folded node at the (public) actual depth as the root.

use ark_bn254::Fr;
use ark_ff::Zero;
use ark_r1cs_std::boolean::Boolean;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;
use ark_r1cs_std::select::CondSelectGadget;
use ark_relations::r1cs::SynthesisError;
use light_poseidon::parameters::bn254_x5::get_poseidon_parameters;
use light_poseidon::PoseidonParameters;

/// poseidon permutation over constraint variables, circom parameterization
pub struct PoseidonGadget {
    params: PoseidonParameters<Fr>,
}

impl PoseidonGadget {
    /// gadget for a fixed input arity (state width = arity + 1)
    pub fn new(nr_inputs: usize) -> Result<Self, SynthesisError> {
        let width = (nr_inputs + 1)
            .try_into()
            .map_err(|_| SynthesisError::Unsatisfiable)?;
        let params =
            get_poseidon_parameters::<Fr>(width).map_err(|_| SynthesisError::Unsatisfiable)?;
        Ok(Self { params })
    }

    pub fn hash(&self, inputs: &[FpVar<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
        debug_assert_eq!(inputs.len() + 1, self.params.width);

        // state = [domain tag 0, inputs...]
        let mut state: Vec<FpVar<Fr>> = Vec::with_capacity(self.params.width);
        state.push(FpVar::constant(Fr::zero()));
        state.extend_from_slice(inputs);

        let half_full = self.params.full_rounds / 2;
        let rounds = self.params.full_rounds + self.params.partial_rounds;
        for round in 0..rounds {
            self.apply_ark(&mut state, round);
            let partial = round >= half_full && round < half_full + self.params.partial_rounds;
            if partial {
                state[0] = pow5(&state[0]);
            } else {
                for x in state.iter_mut() {
                    *x = pow5(x);
                }
            }
            state = self.apply_mds(&state);
        }
        Ok(state[0].clone())
    }

    fn apply_ark(&self, state: &mut [FpVar<Fr>], round: usize) {
        for (i, x) in state.iter_mut().enumerate() {
            *x = x.clone() + FpVar::constant(self.params.ark[round * self.params.width + i]);
        }
    }

    fn apply_mds(&self, state: &[FpVar<Fr>]) -> Vec<FpVar<Fr>> {
        (0..self.params.width)
            .map(|i| {
                let mut acc = FpVar::<Fr>::zero();
                for (j, x) in state.iter().enumerate() {
                    acc += x.clone() * FpVar::constant(self.params.mds[i][j]);
                }
                acc
            })
            .collect()
    }
}

fn pow5(x: &FpVar<Fr>) -> FpVar<Fr> {
    let x2 = x * x;
    let x4 = &x2 * &x2;
    x4 * x
}

/// fold a zero-padded lean-imt sibling path and return the node at
/// `depth`
///
/// bit `i` of the packed index orders the children at level `i`. the
/// indicator sum over all candidate depths is enforced to equal one,
/// which simultaneously bounds `depth` by the padded length.
pub fn lean_imt_root(
    leaf: &FpVar<Fr>,
    index_bits: &[Boolean<Fr>],
    siblings: &[FpVar<Fr>],
    depth: &FpVar<Fr>,
    hasher: &PoseidonGadget,
) -> Result<FpVar<Fr>, SynthesisError> {
    debug_assert_eq!(index_bits.len(), siblings.len());

    let mut nodes: Vec<FpVar<Fr>> = Vec::with_capacity(siblings.len() + 1);
    nodes.push(leaf.clone());
    for (bit, sibling) in index_bits.iter().zip(siblings.iter()) {
        let current = nodes.last().expect("seeded with leaf").clone();
        let left = FpVar::conditionally_select(bit, sibling, &current)?;
        let right = FpVar::conditionally_select(bit, &current, sibling)?;
        nodes.push(hasher.hash(&[left, right])?);
    }

    let mut root = FpVar::<Fr>::zero();
    let mut matched = FpVar::<Fr>::zero();
    for (i, node) in nodes.iter().enumerate() {
        let at_depth = depth.is_eq(&FpVar::constant(Fr::from(i as u64)))?;
        let indicator = FpVar::from(at_depth);
        root += &indicator * node;
        matched += &indicator;
    }
    matched.enforce_equal(&FpVar::one())?;
    Ok(root)
}

/// constrain `x` to `n` bits
pub fn enforce_bit_width(x: &FpVar<Fr>, n: usize) -> Result<(), SynthesisError> {
    use ark_r1cs_std::ToBitsGadget;
    let bits = x.to_bits_le()?;
    for bit in bits.iter().skip(n) {
        bit.enforce_equal(&Boolean::FALSE)?;
    }
    Ok(())
}
