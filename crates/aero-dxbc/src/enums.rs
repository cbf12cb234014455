//! Numbered fields that appear inside operand and declaration tokens.

numbered_enum! {
    /// Register file or operand kind (operand token bits 12..19).
    ///
    /// Labels are the register prefixes used by the disassembler.
    pub enum OperandType("operand type") {
        Temp = 0 => "r",
        Input = 1 => "v",
        Output = 2 => "o",
        IndexableTemp = 3 => "x",
        Imm32 = 4 => "l",
        Imm64 = 5 => "d",
        Sampler = 6 => "s",
        Resource = 7 => "t",
        ConstantBuffer = 8 => "cb",
        ImmediateConstantBuffer = 9 => "icb",
        Label = 10 => "label",
        InputPrimitiveId = 11 => "vPrim",
        OutputDepth = 12 => "oDepth",
        Null = 13 => "null",
        Rasterizer = 14 => "rasterizer",
        OutputCoverageMask = 15 => "oMask",
        Stream = 16 => "m",
        FunctionBody = 17 => "fb",
        FunctionTable = 18 => "ft",
        Interface = 19 => "fp",
        FunctionInput = 20 => "fi",
        FunctionOutput = 21 => "fo",
        OutputControlPointId = 22 => "vOutputControlPointID",
        InputForkInstanceId = 23 => "vForkInstanceID",
        InputJoinInstanceId = 24 => "vJoinInstanceID",
        InputControlPoint = 25 => "vicp",
        OutputControlPoint = 26 => "vocp",
        InputPatchConstant = 27 => "vpc",
        InputDomainPoint = 28 => "vDomain",
        ThisPointer = 29 => "this",
        UnorderedAccessView = 30 => "u",
        ThreadGroupSharedMemory = 31 => "g",
        InputThreadId = 32 => "vThreadID",
        InputThreadGroupId = 33 => "vThreadGroupID",
        InputThreadIdInGroup = 34 => "vThreadIDInGroup",
        InputCoverageMask = 35 => "vCoverage",
        InputThreadIdInGroupFlattened = 36 => "vThreadIDInGroupFlattened",
        InputGsInstanceId = 37 => "vGSInstanceID",
        OutputDepthGreaterEqual = 38 => "oDepthGE",
        OutputDepthLessEqual = 39 => "oDepthLE",
        CycleCounter = 40 => "vCycleCounter",
    }
}

numbered_enum! {
    /// How one operand index is encoded (3-bit field per index).
    pub enum IndexRepresentation("index representation") {
        Imm32 = 0 => "imm32",
        Imm64 = 1 => "imm64",
        Relative = 2 => "relative",
        Imm32Relative = 3 => "imm32+relative",
        Imm64Relative = 4 => "imm64+relative",
    }
}

impl IndexRepresentation {
    /// Whether the index carries an immediate part.
    pub fn has_imm(self) -> bool {
        !matches!(self, Self::Relative)
    }

    /// Whether the index carries a relative (register) part.
    pub fn has_relative(self) -> bool {
        matches!(
            self,
            Self::Relative | Self::Imm32Relative | Self::Imm64Relative
        )
    }

    /// Words used by the immediate part.
    pub fn imm_words(self) -> usize {
        match self {
            Self::Imm32 | Self::Imm32Relative => 1,
            Self::Imm64 | Self::Imm64Relative => 2,
            Self::Relative => 0,
        }
    }
}

numbered_enum! {
    /// Texture dimension of a resource declaration.
    pub enum ResourceDim("resource dimension") {
        Unknown = 0 => "unknown",
        Buffer = 1 => "buffer",
        Texture1D = 2 => "texture1d",
        Texture2D = 3 => "texture2d",
        Texture2DMs = 4 => "texture2dms",
        Texture3D = 5 => "texture3d",
        TextureCube = 6 => "texturecube",
        Texture1DArray = 7 => "texture1darray",
        Texture2DArray = 8 => "texture2darray",
        Texture2DMsArray = 9 => "texture2dmsarray",
        TextureCubeArray = 10 => "texturecubearray",
        RawBuffer = 11 => "raw_buffer",
        StructuredBuffer = 12 => "structured_buffer",
    }
}

impl ResourceDim {
    /// Whether the resource is one of the buffer kinds.
    pub fn is_buffer(self) -> bool {
        matches!(self, Self::Buffer | Self::RawBuffer | Self::StructuredBuffer)
    }

    /// Whether the resource is multisampled.
    pub fn is_multisampled(self) -> bool {
        matches!(self, Self::Texture2DMs | Self::Texture2DMsArray)
    }

    /// Whether the resource has an array layer coordinate.
    pub fn is_array(self) -> bool {
        matches!(
            self,
            Self::Texture1DArray
                | Self::Texture2DArray
                | Self::Texture2DMsArray
                | Self::TextureCubeArray
        )
    }
}

numbered_enum! {
    /// Per-component return type of a resource declaration.
    pub enum ResourceReturnType("resource return type") {
        Unorm = 1 => "unorm",
        Snorm = 2 => "snorm",
        Sint = 3 => "sint",
        Uint = 4 => "uint",
        Float = 5 => "float",
        Mixed = 6 => "mixed",
        Double = 7 => "double",
        Continued = 8 => "continued",
        Unused = 9 => "unused",
    }
}

numbered_enum! {
    /// System-value tag of an interface declaration.
    pub enum SystemValue("system value") {
        Undefined = 0 => "undefined",
        Position = 1 => "position",
        ClipDistance = 2 => "clip_distance",
        CullDistance = 3 => "cull_distance",
        RenderTargetArrayIndex = 4 => "rendertarget_array_index",
        ViewportArrayIndex = 5 => "viewport_array_index",
        VertexId = 6 => "vertex_id",
        PrimitiveId = 7 => "primitive_id",
        InstanceId = 8 => "instance_id",
        IsFrontFace = 9 => "is_front_face",
        SampleIndex = 10 => "sampleIndex",
        FinalQuadUEq0EdgeTessFactor = 11 => "finalQuadUeq0EdgeTessFactor",
        FinalQuadVEq0EdgeTessFactor = 12 => "finalQuadVeq0EdgeTessFactor",
        FinalQuadUEq1EdgeTessFactor = 13 => "finalQuadUeq1EdgeTessFactor",
        FinalQuadVEq1EdgeTessFactor = 14 => "finalQuadVeq1EdgeTessFactor",
        FinalQuadUInsideTessFactor = 15 => "finalQuadUInsideTessFactor",
        FinalQuadVInsideTessFactor = 16 => "finalQuadVInsideTessFactor",
        FinalTriUEq0EdgeTessFactor = 17 => "finalTriUeq0EdgeTessFactor",
        FinalTriVEq0EdgeTessFactor = 18 => "finalTriVeq0EdgeTessFactor",
        FinalTriWEq0EdgeTessFactor = 19 => "finalTriWeq0EdgeTessFactor",
        FinalTriInsideTessFactor = 20 => "finalTriInsideTessFactor",
        FinalLineDetailTessFactor = 21 => "finalLineDetailTessFactor",
        FinalLineDensityTessFactor = 22 => "finalLineDensityTessFactor",
    }
}

numbered_enum! {
    /// Interpolation mode of a pixel shader input.
    pub enum InterpolationMode("interpolation mode") {
        Undefined = 0 => "undefined",
        Constant = 1 => "constant",
        Linear = 2 => "linear",
        LinearCentroid = 3 => "linear centroid",
        LinearNoPerspective = 4 => "linear noperspective",
        LinearNoPerspectiveCentroid = 5 => "linear noperspective centroid",
        LinearSample = 6 => "linear sample",
        LinearNoPerspectiveSample = 7 => "linear noperspective sample",
    }
}

numbered_enum! {
    /// Sampler declaration mode.
    pub enum SamplerMode("sampler mode") {
        Default = 0 => "mode_default",
        Comparison = 1 => "mode_comparison",
        Mono = 2 => "mode_mono",
    }
}
