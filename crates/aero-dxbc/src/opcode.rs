//! Opcode tokens and the control fields packed into them.

use bitflags::bitflags;

numbered_enum! {
    /// SM4/SM5 instruction opcode.
    ///
    /// Values 107, 112 and 209 are the instruction-count markers of the
    /// D3D10.0, D3D10.1 and D3D11.0 opcode tables and never appear in a
    /// valid program.
    pub enum Opcode("opcode") {
        Add = 0 => "add",
        And = 1 => "and",
        Break = 2 => "break",
        Breakc = 3 => "breakc",
        Call = 4 => "call",
        Callc = 5 => "callc",
        Case = 6 => "case",
        Continue = 7 => "continue",
        Continuec = 8 => "continuec",
        Cut = 9 => "cut",
        Default = 10 => "default",
        DerivRtx = 11 => "deriv_rtx",
        DerivRty = 12 => "deriv_rty",
        Discard = 13 => "discard",
        Div = 14 => "div",
        Dp2 = 15 => "dp2",
        Dp3 = 16 => "dp3",
        Dp4 = 17 => "dp4",
        Else = 18 => "else",
        Emit = 19 => "emit",
        EmitThenCut = 20 => "emit_then_cut",
        EndIf = 21 => "endif",
        EndLoop = 22 => "endloop",
        EndSwitch = 23 => "endswitch",
        Eq = 24 => "eq",
        Exp = 25 => "exp",
        Frc = 26 => "frc",
        Ftoi = 27 => "ftoi",
        Ftou = 28 => "ftou",
        Ge = 29 => "ge",
        IAdd = 30 => "iadd",
        If = 31 => "if",
        IEq = 32 => "ieq",
        IGe = 33 => "ige",
        ILt = 34 => "ilt",
        IMad = 35 => "imad",
        IMax = 36 => "imax",
        IMin = 37 => "imin",
        IMul = 38 => "imul",
        INe = 39 => "ine",
        INeg = 40 => "ineg",
        IShl = 41 => "ishl",
        IShr = 42 => "ishr",
        Itof = 43 => "itof",
        Label = 44 => "label",
        Ld = 45 => "ld",
        LdMs = 46 => "ld_ms",
        Log = 47 => "log",
        Loop = 48 => "loop",
        Lt = 49 => "lt",
        Mad = 50 => "mad",
        Min = 51 => "min",
        Max = 52 => "max",
        CustomData = 53 => "customdata",
        Mov = 54 => "mov",
        Movc = 55 => "movc",
        Mul = 56 => "mul",
        Ne = 57 => "ne",
        Nop = 58 => "nop",
        Not = 59 => "not",
        Or = 60 => "or",
        ResInfo = 61 => "resinfo",
        Ret = 62 => "ret",
        Retc = 63 => "retc",
        RoundNe = 64 => "round_ne",
        RoundNi = 65 => "round_ni",
        RoundPi = 66 => "round_pi",
        RoundZ = 67 => "round_z",
        Rsq = 68 => "rsq",
        Sample = 69 => "sample",
        SampleC = 70 => "sample_c",
        SampleCLz = 71 => "sample_c_lz",
        SampleL = 72 => "sample_l",
        SampleD = 73 => "sample_d",
        SampleB = 74 => "sample_b",
        Sqrt = 75 => "sqrt",
        Switch = 76 => "switch",
        SinCos = 77 => "sincos",
        UDiv = 78 => "udiv",
        ULt = 79 => "ult",
        UGe = 80 => "uge",
        UMul = 81 => "umul",
        UMad = 82 => "umad",
        UMax = 83 => "umax",
        UMin = 84 => "umin",
        UShr = 85 => "ushr",
        Utof = 86 => "utof",
        Xor = 87 => "xor",
        DclResource = 88 => "dcl_resource",
        DclConstantBuffer = 89 => "dcl_constantbuffer",
        DclSampler = 90 => "dcl_sampler",
        DclIndexRange = 91 => "dcl_indexrange",
        DclGsOutputPrimitiveTopology = 92 => "dcl_outputtopology",
        DclGsInputPrimitive = 93 => "dcl_inputprimitive",
        DclMaxOutputVertexCount = 94 => "dcl_maxout",
        DclInput = 95 => "dcl_input",
        DclInputSgv = 96 => "dcl_input_sgv",
        DclInputSiv = 97 => "dcl_input_siv",
        DclInputPs = 98 => "dcl_input_ps",
        DclInputPsSgv = 99 => "dcl_input_ps_sgv",
        DclInputPsSiv = 100 => "dcl_input_ps_siv",
        DclOutput = 101 => "dcl_output",
        DclOutputSgv = 102 => "dcl_output_sgv",
        DclOutputSiv = 103 => "dcl_output_siv",
        DclTemps = 104 => "dcl_temps",
        DclIndexableTemp = 105 => "dcl_indexabletemp",
        DclGlobalFlags = 106 => "dcl_globalflags",
        Lod = 108 => "lod",
        Gather4 = 109 => "gather4",
        SamplePos = 110 => "samplepos",
        SampleInfo = 111 => "sampleinfo",
        HsDecls = 113 => "hs_decls",
        HsControlPointPhase = 114 => "hs_control_point_phase",
        HsForkPhase = 115 => "hs_fork_phase",
        HsJoinPhase = 116 => "hs_join_phase",
        EmitStream = 117 => "emit_stream",
        CutStream = 118 => "cut_stream",
        EmitThenCutStream = 119 => "emit_then_cut_stream",
        InterfaceCall = 120 => "fcall",
        BufInfo = 121 => "bufinfo",
        DerivRtxCoarse = 122 => "deriv_rtx_coarse",
        DerivRtxFine = 123 => "deriv_rtx_fine",
        DerivRtyCoarse = 124 => "deriv_rty_coarse",
        DerivRtyFine = 125 => "deriv_rty_fine",
        Gather4C = 126 => "gather4_c",
        Gather4Po = 127 => "gather4_po",
        Gather4PoC = 128 => "gather4_po_c",
        Rcp = 129 => "rcp",
        F32toF16 = 130 => "f32tof16",
        F16toF32 = 131 => "f16tof32",
        UAddc = 132 => "uaddc",
        USubb = 133 => "usubb",
        CountBits = 134 => "countbits",
        FirstBitHi = 135 => "firstbit_hi",
        FirstBitLo = 136 => "firstbit_lo",
        FirstBitShi = 137 => "firstbit_shi",
        UBfe = 138 => "ubfe",
        IBfe = 139 => "ibfe",
        Bfi = 140 => "bfi",
        BfRev = 141 => "bfrev",
        Swapc = 142 => "swapc",
        DclStream = 143 => "dcl_stream",
        DclFunctionBody = 144 => "dcl_function_body",
        DclFunctionTable = 145 => "dcl_function_table",
        DclInterface = 146 => "dcl_interface",
        DclInputControlPointCount = 147 => "dcl_input_control_point_count",
        DclOutputControlPointCount = 148 => "dcl_output_control_point_count",
        DclTessDomain = 149 => "dcl_tessellator_domain",
        DclTessPartitioning = 150 => "dcl_tessellator_partitioning",
        DclTessOutputPrimitive = 151 => "dcl_tessellator_output_primitive",
        DclHsMaxTessFactor = 152 => "dcl_hs_max_tessfactor",
        DclHsForkPhaseInstanceCount = 153 => "dcl_hs_fork_phase_instance_count",
        DclHsJoinPhaseInstanceCount = 154 => "dcl_hs_join_phase_instance_count",
        DclThreadGroup = 155 => "dcl_thread_group",
        DclUavTyped = 156 => "dcl_uav_typed",
        DclUavRaw = 157 => "dcl_uav_raw",
        DclUavStructured = 158 => "dcl_uav_structured",
        DclThreadGroupSharedMemoryRaw = 159 => "dcl_tgsm_raw",
        DclThreadGroupSharedMemoryStructured = 160 => "dcl_tgsm_structured",
        DclResourceRaw = 161 => "dcl_resource_raw",
        DclResourceStructured = 162 => "dcl_resource_structured",
        LdUavTyped = 163 => "ld_uav_typed",
        StoreUavTyped = 164 => "store_uav_typed",
        LdRaw = 165 => "ld_raw",
        StoreRaw = 166 => "store_raw",
        LdStructured = 167 => "ld_structured",
        StoreStructured = 168 => "store_structured",
        AtomicAnd = 169 => "atomic_and",
        AtomicOr = 170 => "atomic_or",
        AtomicXor = 171 => "atomic_xor",
        AtomicCmpStore = 172 => "atomic_cmp_store",
        AtomicIAdd = 173 => "atomic_iadd",
        AtomicIMax = 174 => "atomic_imax",
        AtomicIMin = 175 => "atomic_imin",
        AtomicUMax = 176 => "atomic_umax",
        AtomicUMin = 177 => "atomic_umin",
        ImmAtomicAlloc = 178 => "imm_atomic_alloc",
        ImmAtomicConsume = 179 => "imm_atomic_consume",
        ImmAtomicIAdd = 180 => "imm_atomic_iadd",
        ImmAtomicAnd = 181 => "imm_atomic_and",
        ImmAtomicOr = 182 => "imm_atomic_or",
        ImmAtomicXor = 183 => "imm_atomic_xor",
        ImmAtomicExch = 184 => "imm_atomic_exch",
        ImmAtomicCmpExch = 185 => "imm_atomic_cmp_exch",
        ImmAtomicIMax = 186 => "imm_atomic_imax",
        ImmAtomicIMin = 187 => "imm_atomic_imin",
        ImmAtomicUMax = 188 => "imm_atomic_umax",
        ImmAtomicUMin = 189 => "imm_atomic_umin",
        Sync = 190 => "sync",
        DAdd = 191 => "dadd",
        DMax = 192 => "dmax",
        DMin = 193 => "dmin",
        DMul = 194 => "dmul",
        DEq = 195 => "deq",
        DGe = 196 => "dge",
        DLt = 197 => "dlt",
        DNe = 198 => "dne",
        DMov = 199 => "dmov",
        DMovc = 200 => "dmovc",
        DtoF = 201 => "dtof",
        FtoD = 202 => "ftod",
        EvalSnapped = 203 => "eval_snapped",
        EvalSampleIndex = 204 => "eval_sample_index",
        EvalCentroid = 205 => "eval_centroid",
        DclGsInstanceCount = 206 => "dcl_gsinstances",
        Abort = 207 => "abort",
        DebugBreak = 208 => "debug_break",
        DDiv = 210 => "ddiv",
        DFma = 211 => "dfma",
        DRcp = 212 => "drcp",
        Msad = 213 => "msad",
        DtoI = 214 => "dtoi",
        DtoU = 215 => "dtou",
        ItoD = 216 => "itod",
        UtoD = 217 => "utod",
    }
}

impl Opcode {
    /// Assembly mnemonic, e.g. `dp3` or `dcl_constantbuffer`.
    pub fn mnemonic(self) -> &'static str {
        self.label()
    }

    /// Declarations describe program state and never execute.
    pub fn is_declaration(self) -> bool {
        self.label().starts_with("dcl_") || self == Opcode::HsDecls
    }
}

const OPCODE_MASK: u32 = 0x7ff;
const CONTROL_SHIFT: u32 = 11;
const CONTROL_MASK: u32 = 0x1fff;
const LENGTH_SHIFT: u32 = 24;
const LENGTH_MASK: u32 = 0x7f;
const EXTENDED_BIT: u32 = 1 << 31;

/// First token of every instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpcodeToken(pub u32);

impl OpcodeToken {
    /// Raw opcode number (bits 0..10).
    pub fn opcode_raw(self) -> u32 {
        self.0 & OPCODE_MASK
    }

    /// Decoded opcode, or `None` for values outside the opcode table.
    pub fn opcode(self) -> Option<Opcode> {
        Opcode::from_raw(self.opcode_raw())
    }

    /// Opcode-specific control bits (11..23).
    pub fn control(self) -> OpcodeControl {
        OpcodeControl((self.0 >> CONTROL_SHIFT) & CONTROL_MASK)
    }

    /// Instruction length in words, including this token.
    ///
    /// `customdata` blocks store their length in the following word instead;
    /// the instruction reader handles that case.
    pub fn length(self) -> usize {
        ((self.0 >> LENGTH_SHIFT) & LENGTH_MASK) as usize
    }

    /// Whether an extended opcode token follows.
    pub fn is_extended(self) -> bool {
        self.0 & EXTENDED_BIT != 0
    }
}

/// Control bits of an opcode token.
///
/// Their meaning depends on the opcode: arithmetic instructions carry the
/// saturate flag, `dcl_resource` the resource dimension, pixel shader input
/// declarations the interpolation mode, and so on. Accessors take bit
/// positions relative to the full opcode token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpcodeControl(u32);

impl OpcodeControl {
    /// Control bits shifted down to bit 0.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Extracts token bits `first..=last`.
    pub fn bits(self, first: u32, last: u32) -> u32 {
        debug_assert!(first >= CONTROL_SHIFT && last >= first && last < LENGTH_SHIFT);
        let word = self.0 << CONTROL_SHIFT;
        let count = last - first + 1;
        (word >> first) & ((1u32 << count) - 1)
    }

    /// Result saturation (`_sat`).
    pub fn saturate(self) -> bool {
        self.bits(13, 13) != 0
    }

    /// Resource dimension field of `dcl_resource` and `dcl_uav_typed`.
    pub fn resource_dim_raw(self) -> u32 {
        self.bits(11, 15)
    }

    /// Sample count of multisampled `dcl_resource` declarations.
    pub fn resource_sample_count(self) -> u32 {
        self.bits(16, 22)
    }

    /// Interpolation mode field of pixel shader input declarations.
    pub fn interpolation_mode_raw(self) -> u32 {
        self.bits(11, 14)
    }

    /// Sampler mode field of `dcl_sampler`.
    pub fn sampler_mode_raw(self) -> u32 {
        self.bits(11, 14)
    }

    /// Flags carried by `dcl_globalflags`.
    pub fn global_flags(self) -> GlobalFlags {
        GlobalFlags::from_bits_retain(self.0)
    }

    /// `_nz` test of conditional instructions (`if_nz`, `breakc_nz`, ...).
    pub fn test_nonzero(self) -> bool {
        self.bits(18, 18) != 0
    }
}

bitflags! {
    /// `dcl_globalflags` bits, relative to the start of the control field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GlobalFlags: u32 {
        /// `refactoringAllowed`
        const REFACTORING_ALLOWED = 1 << 0;
        /// `enableDoublePrecisionFloatOps`
        const ENABLE_DOUBLE_PRECISION = 1 << 1;
        /// `forceEarlyDepthStencil`
        const FORCE_EARLY_DEPTH_STENCIL = 1 << 2;
        /// `enableRawAndStructuredBuffers`
        const ENABLE_RAW_AND_STRUCTURED_BUFFERS = 1 << 3;
        /// `skipOptimization`
        const SKIP_OPTIMIZATION = 1 << 4;
        /// `enableMinimumPrecision`
        const ENABLE_MINIMUM_PRECISION = 1 << 5;
        /// `enable11_1DoubleExtensions`
        const ENABLE_DOUBLE_EXTENSIONS = 1 << 6;
        /// `enable11_1ShaderExtensions`
        const ENABLE_SHADER_EXTENSIONS = 1 << 7;
    }
}

numbered_enum! {
    /// Kind of an extended opcode token.
    pub enum OpcodeExtKind("extended opcode type") {
        Empty = 0 => "empty",
        SampleControls = 1 => "sample_controls",
        ResourceDim = 2 => "resource_dim",
        ResourceReturnType = 3 => "resource_return_type",
    }
}

/// Extended opcode token following an [`OpcodeToken`] with the extended bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpcodeExt(pub u32);

impl OpcodeExt {
    /// Raw kind field (bits 0..5).
    pub fn kind_raw(self) -> u32 {
        self.0 & 0x3f
    }

    /// Decoded kind.
    pub fn kind(self) -> Option<OpcodeExtKind> {
        OpcodeExtKind::from_raw(self.kind_raw())
    }

    /// Whether another extended opcode token follows.
    pub fn is_extended(self) -> bool {
        self.0 & EXTENDED_BIT != 0
    }

    /// Immediate texel offsets `(u, v, w)` of a sample-controls token.
    pub fn sample_offsets(self) -> [i8; 3] {
        [9, 13, 17].map(|shift| (((self.0 >> shift) << 28) as i32 >> 28) as i8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_table_has_no_gaps_besides_count_markers() {
        let missing: Vec<u32> = (0..=217).filter(|&v| Opcode::from_raw(v).is_none()).collect();
        assert_eq!(missing, vec![107, 112, 209]);
        assert_eq!(Opcode::from_raw(218), None);
    }

    #[test]
    fn opcode_token_fields() {
        // dp3_sat, length 7, not extended.
        let token = OpcodeToken(16 | (1 << 13) | (7 << 24));
        assert_eq!(token.opcode(), Some(Opcode::Dp3));
        assert!(token.control().saturate());
        assert_eq!(token.length(), 7);
        assert!(!token.is_extended());
    }

    #[test]
    fn declaration_classification() {
        assert!(Opcode::DclTemps.is_declaration());
        assert!(Opcode::DclThreadGroup.is_declaration());
        assert!(!Opcode::Mov.is_declaration());
        assert_eq!(Opcode::DclConstantBuffer.mnemonic(), "dcl_constantbuffer");
    }

    #[test]
    fn sample_offsets_are_sign_extended() {
        // u = -1, v = 7, w = -8
        let ext = OpcodeExt(1 | (0xf << 9) | (0x7 << 13) | (0x8 << 17));
        assert_eq!(ext.kind(), Some(OpcodeExtKind::SampleControls));
        assert_eq!(ext.sample_offsets(), [-1, 7, -8]);
    }

    #[test]
    fn resource_dim_uses_five_bits() {
        // Structured buffer (12) needs bit 15.
        let token = OpcodeToken(88 | (12 << 11) | (4 << 24));
        assert_eq!(token.control().resource_dim_raw(), 12);
    }
}
